//! Per-file status ledger: one JSON document mapping file identifier to the
//! last recorded lifecycle status and its UTC timestamp.
//!
//! The whole document is rewritten on every update, but atomically
//! (write-temp-then-rename) and behind a process-wide mutex, so concurrent
//! updates for different identifiers cannot drop each other and a reader
//! never observes a torn file. A ledger file that exists but does not parse
//! is a loud error, never a silent reset: discarding history on corruption
//! would be worse than refusing to proceed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: String,
    pub timestamp: Option<String>,
}

impl StatusRecord {
    /// Sentinel returned for identifiers with no recorded status.
    pub fn not_found() -> Self {
        Self { status: "not_found".to_string(), timestamp: None }
    }
}

#[derive(Clone)]
pub struct StatusLedger {
    path: PathBuf,
    update_lock: Arc<parking_lot::Mutex<()>>,
}

impl StatusLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), update_lock: Arc::new(parking_lot::Mutex::new(())) }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn load(&self) -> AppResult<BTreeMap<String, StatusRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = std::fs::read(&self.path)
            .map_err(|e| AppError::io("ledger_read", format!("Failed to read status ledger: {}", e)))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::internal(
                "ledger_corrupt",
                format!("Status ledger at {} is unreadable: {}", self.path.display(), e),
            )
        })
    }

    /// Record `status` for `id` with the current UTC time, rewriting the whole
    /// document atomically.
    pub fn update(&self, id: &str, status: &str) -> AppResult<()> {
        let _g = self.update_lock.lock();
        let mut ledger = self.load()?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        ledger.insert(
            id.to_string(),
            StatusRecord { status: status.to_string(), timestamp: Some(now) },
        );
        let bytes = serde_json::to_vec_pretty(&ledger)
            .map_err(|e| AppError::internal("ledger_encode", e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)
            .map_err(|e| AppError::io("ledger_write", format!("Failed to write status ledger: {}", e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::io("ledger_write", format!("Failed to replace status ledger: {}", e)))?;
        debug!(target: "gridbase::ledger", "update: id='{}', status='{}'", id, status);
        Ok(())
    }

    /// Recorded entry for `id`, or the `not_found` sentinel.
    pub fn get(&self, id: &str) -> AppResult<StatusRecord> {
        let ledger = self.load()?;
        Ok(ledger.get(id).cloned().unwrap_or_else(StatusRecord::not_found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_then_get_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
        ledger.update("abc", "uploaded").unwrap();
        let rec = ledger.get("abc").unwrap();
        assert_eq!(rec.status, "uploaded");
        let ts = rec.timestamp.unwrap();
        assert!(ts.ends_with('Z'), "timestamp must be UTC with Z suffix: {}", ts);
    }

    #[test]
    fn missing_id_returns_sentinel() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
        let rec = ledger.get("ghost").unwrap();
        assert_eq!(rec, StatusRecord::not_found());
    }

    #[test]
    fn update_overwrites_not_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
        ledger.update("abc", "uploaded").unwrap();
        ledger.update("abc", "modified").unwrap();
        assert_eq!(ledger.get("abc").unwrap().status, "modified");
    }

    #[test]
    fn entries_survive_a_new_ledger_over_the_same_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("file_statuses.json");
        StatusLedger::new(&path).update("abc", "exported").unwrap();
        let reopened = StatusLedger::new(&path);
        assert_eq!(reopened.get("abc").unwrap().status, "exported");
    }

    #[test]
    fn corrupt_ledger_fails_loudly() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("file_statuses.json");
        std::fs::write(&path, b"{not json").unwrap();
        let ledger = StatusLedger::new(&path);
        let err = ledger.get("abc").unwrap_err();
        assert_eq!(err.http_status(), 500);
        // An update must also refuse to clobber the corrupt file
        assert!(ledger.update("abc", "modified").is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"{not json");
    }

    #[test]
    fn updates_for_different_ids_do_not_drop_each_other() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = StatusLedger::new(tmp.path().join("file_statuses.json"));
        ledger.update("a", "uploaded").unwrap();
        ledger.update("b", "modified").unwrap();
        assert_eq!(ledger.get("a").unwrap().status, "uploaded");
        assert_eq!(ledger.get("b").unwrap().status, "modified");
    }
}
