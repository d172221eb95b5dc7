//! Filter preview: evaluates a `column op value` predicate over the live
//! table and returns the total match count plus a bounded slice of matching
//! rows. Read-only — never writes back to the session store.

use polars::prelude::*;

use crate::action::CmpOp;
use crate::engine::{cmp_expr, TypedValue};
use crate::error::{AppError, AppResult};
use crate::session::SessionStore;

#[derive(Debug)]
pub struct FilterPreview {
    /// Matches across the whole table, independent of `limit`.
    pub count: usize,
    pub rows: DataFrame,
}

pub fn filter_preview(
    store: &SessionStore,
    id: &str,
    column: &str,
    operator: &str,
    raw_value: &str,
    limit: usize,
) -> AppResult<FilterPreview> {
    let df = store.snapshot(id).ok_or_else(|| AppError::session_not_found(id))?;

    let col_ok = df.get_column_names().iter().any(|c| c.as_str() == column);
    if !col_ok {
        return Err(AppError::user("unknown_column", format!("Column '{}' not found.", column)));
    }
    let op = CmpOp::parse(operator)
        .ok_or_else(|| AppError::unsupported("bad_operator", format!("Unsupported operator '{}'.", operator)))?;

    let dt = df.column(column)?.dtype().clone();
    let typed = TypedValue::from_text(&dt, raw_value)?;
    let predicate = cmp_expr(&dt, column, op, &typed)?;

    let filtered = df.lazy().filter(predicate).collect()?;
    let count = filtered.height();
    Ok(FilterPreview { count, rows: filtered.slice(0, limit) })
}
