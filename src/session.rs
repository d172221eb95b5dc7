//! In-process session store: one live table per uploaded file identifier.
//!
//! The map itself sits behind an RwLock; every table sits behind its own
//! Mutex so concurrent requests against the same identifier serialize their
//! read-modify-write cycles instead of losing updates. No raw handle to a
//! stored table ever escapes: `snapshot` clones (polars columns are
//! Arc-backed, so this is cheap) and `with_table` runs the caller's closure
//! under the entry lock.

use std::collections::HashMap;
use std::sync::Arc;

use polars::prelude::DataFrame;
use tracing::debug;

use crate::error::{AppError, AppResult};

#[derive(Clone, Default)]
pub struct SessionStore {
    map: Arc<parking_lot::RwLock<HashMap<String, Arc<parking_lot::Mutex<DataFrame>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace or create the session unconditionally. No merge.
    pub fn put(&self, id: &str, table: DataFrame) {
        debug!(target: "gridbase::session", "put: id='{}', rows={}", id, table.height());
        let mut w = self.map.write();
        w.insert(id.to_string(), Arc::new(parking_lot::Mutex::new(table)));
    }

    /// Clone of the current table, or None. Never fails.
    pub fn snapshot(&self, id: &str) -> Option<DataFrame> {
        let entry = self.map.read().get(id).cloned()?;
        let g = entry.lock();
        Some(g.clone())
    }

    /// Run `f` against the live table under its entry lock and keep the result
    /// in place. All committing mutations go through here.
    pub fn with_table<T>(&self, id: &str, f: impl FnOnce(&mut DataFrame) -> AppResult<T>) -> AppResult<T> {
        let entry = self
            .map
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::session_not_found(id))?;
        let mut g = entry.lock();
        f(&mut g)
    }

    /// Remove the entry if present. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let existed = self.map.write().remove(id).is_some();
        debug!(target: "gridbase::session", "remove: id='{}', existed={}", id, existed);
        existed
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn two_row_table() -> DataFrame {
        let region = Series::new("Region".into(), vec!["East", "West"]);
        let profit = Series::new("Profit".into(), vec![100i64, 300]);
        DataFrame::new(vec![region.into(), profit.into()]).unwrap()
    }

    #[test]
    fn put_then_snapshot_returns_a_copy() {
        let store = SessionStore::new();
        store.put("a", two_row_table());
        let mut snap = store.snapshot("a").unwrap();
        assert_eq!(snap.height(), 2);
        // Mutating the snapshot must not touch the stored table
        snap = snap.slice(0, 1);
        assert_eq!(snap.height(), 1);
        assert_eq!(store.snapshot("a").unwrap().height(), 2);
    }

    #[test]
    fn snapshot_of_unknown_id_is_none() {
        let store = SessionStore::new();
        assert!(store.snapshot("nope").is_none());
    }

    #[test]
    fn put_replaces_wholesale() {
        let store = SessionStore::new();
        store.put("a", two_row_table());
        let one = two_row_table().slice(0, 1);
        store.put("a", one);
        assert_eq!(store.snapshot("a").unwrap().height(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn with_table_commits_in_place() {
        let store = SessionStore::new();
        store.put("a", two_row_table());
        store
            .with_table("a", |df| {
                *df = df.slice(1, 1);
                Ok(())
            })
            .unwrap();
        let snap = store.snapshot("a").unwrap();
        assert_eq!(snap.height(), 1);
    }

    #[test]
    fn with_table_on_missing_id_is_not_found() {
        let store = SessionStore::new();
        let err = store.with_table("ghost", |_| Ok(())).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let store = SessionStore::new();
        store.put("a", two_row_table());
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(store.is_empty());
    }
}
