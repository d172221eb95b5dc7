//! Sort preview/commit: produces a sorted copy of the live table. The
//! explicit `persist` flag is the only place a preview-style operation can
//! opt into committing — when set, the sorted table replaces the stored one
//! and status `"modified (sort)"` is recorded; otherwise the stored table is
//! left untouched.

use polars::prelude::*;
use tracing::info;

use crate::engine::sorted_by;
use crate::error::{AppError, AppResult};
use crate::ledger::StatusLedger;
use crate::session::SessionStore;

pub fn sort_preview(
    store: &SessionStore,
    ledger: &StatusLedger,
    id: &str,
    column: &str,
    order: &str,
    limit: usize,
    persist: bool,
) -> AppResult<DataFrame> {
    let ascending = order.eq_ignore_ascii_case("asc");

    let sorted = if persist {
        let sorted = store.with_table(id, |df| {
            check_column(df, column)?;
            *df = sorted_by(df, column, ascending)?;
            Ok(df.clone())
        })?;
        ledger.update(id, "modified (sort)")?;
        info!(target: "gridbase::engine", "sort committed: id='{}', column='{}', ascending={}", id, column, ascending);
        sorted
    } else {
        let df = store.snapshot(id).ok_or_else(|| AppError::session_not_found(id))?;
        check_column(&df, column)?;
        sorted_by(&df, column, ascending)?
    };

    Ok(sorted.slice(0, limit))
}

fn check_column(df: &DataFrame, column: &str) -> AppResult<()> {
    if df.get_column_names().iter().any(|c| c.as_str() == column) {
        Ok(())
    } else {
        Err(AppError::user("unknown_column", format!("Column '{}' not found.", column)))
    }
}
