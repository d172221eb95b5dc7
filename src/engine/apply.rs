//! Action executor: validates a raw descriptor, parses it into the closed
//! `Action` union, and applies it to the live table as one atomic transform.
//! This is the committing path — its `filter` discards non-matching rows from
//! the stored table, unlike the read-only preview in `engine::filter`.

use polars::prelude::*;
use serde_json::Value;
use tracing::info;

use crate::action::{self, Action};
use crate::engine::{cmp_expr, column_from_literal, known_columns, sorted_by, TypedValue};
use crate::error::{AppError, AppResult};
use crate::ledger::StatusLedger;
use crate::session::SessionStore;

/// Apply one action to the table owned by `id`, write it back, and record
/// status `"modified"`. Returns the parsed action so callers can echo it.
pub fn apply_action(
    store: &SessionStore,
    ledger: &StatusLedger,
    id: &str,
    descriptor: &Value,
) -> AppResult<Action> {
    let applied = store.with_table(id, |df| {
        // Re-validate against the table's current columns before parsing;
        // the validator's message is the client-facing one.
        action::validate(descriptor, &known_columns(df))
            .map_err(|msg| AppError::schema("invalid_action", msg))?;
        let act: Action = serde_json::from_value(descriptor.clone())
            .map_err(|e| AppError::schema("invalid_action", format!("Malformed action: {}", e)))?;

        match &act {
            Action::Sort { column, order } => {
                // Ascending unless the order text case-insensitively differs from "asc"
                let ascending = order.as_deref().unwrap_or("asc").eq_ignore_ascii_case("asc");
                *df = sorted_by(df, column, ascending)?;
            }
            Action::Filter { column, condition } => {
                let dt = df.column(column)?.dtype().clone();
                let typed = TypedValue::from_json(&dt, &condition.value)?;
                let predicate = cmp_expr(&dt, column, condition.operator, &typed)?;
                *df = df.clone().lazy().filter(predicate).collect()?;
            }
            Action::Update { column, value } => {
                let s = column_from_literal(column, value, df.height())?;
                df.replace(column, s)?;
            }
        }
        Ok(act)
    })?;

    ledger.update(id, "modified")?;
    info!(target: "gridbase::engine", "apply_action: id='{}', column='{}'", id, applied.column());
    Ok(applied)
}
