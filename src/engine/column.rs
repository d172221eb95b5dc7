//! Column patch engine: one column-wide transform per request — a
//! homogeneous overwrite, a string case operation, or a numeric delta.

use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::engine::{column_from_literal, is_numeric_dtype, is_string_dtype};
use crate::error::{AppError, AppResult};
use crate::ledger::StatusLedger;
use crate::session::SessionStore;

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnPatch {
    pub column: String,
    /// For a plain overwrite; exactly one of `value`/`operation` is meaningful.
    #[serde(default)]
    pub value: Option<Value>,
    /// upper | lower | title | add | sub
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub delta: Option<serde_json::Number>,
}

/// Apply the patch, record status `"modified (column patch)"`, and return the
/// resulting table so the caller can serve a bounded preview without a second
/// fetch.
pub fn apply_column_patch(
    store: &SessionStore,
    ledger: &StatusLedger,
    id: &str,
    patch: &ColumnPatch,
) -> AppResult<DataFrame> {
    let result = store.with_table(id, |df| {
        let name = patch.column.as_str();
        let col_ok = df.get_column_names().iter().any(|c| c.as_str() == name);
        if !col_ok {
            return Err(AppError::user("unknown_column", "Column not found."));
        }
        let dt = df.column(name)?.dtype().clone();

        match patch.operation.as_deref() {
            None => {
                let Some(value) = patch.value.as_ref() else {
                    return Err(AppError::user("missing_field", "Provide 'value' or 'operation'."));
                };
                let s = column_from_literal(name, value, df.height())?;
                df.replace(name, s)?;
            }
            Some(op @ ("upper" | "lower" | "title")) => {
                if !is_string_dtype(&dt) {
                    return Err(AppError::type_mismatch(
                        "string_op",
                        "String operation on non-string column.",
                    ));
                }
                match op {
                    "upper" => {
                        *df = df
                            .clone()
                            .lazy()
                            .with_column(col(name).str().to_uppercase().alias(name))
                            .collect()?;
                    }
                    "lower" => {
                        *df = df
                            .clone()
                            .lazy()
                            .with_column(col(name).str().to_lowercase().alias(name))
                            .collect()?;
                    }
                    _ => {
                        let rebuilt = title_case_column(df, name)?;
                        df.replace(name, rebuilt)?;
                    }
                }
            }
            Some(op @ ("add" | "sub")) => {
                let Some(delta) = patch.delta.as_ref() else {
                    return Err(AppError::user("missing_field", "Missing 'delta' for numeric operation."));
                };
                if !is_numeric_dtype(&dt) {
                    return Err(AppError::type_mismatch(
                        "numeric_op",
                        "Numeric operation on non-numeric column.",
                    ));
                }
                // Whole deltas on an Int64 column stay Int64; fractional
                // deltas promote through the supertype to Float64.
                let delta_lit = match (delta.as_i64(), matches!(dt, DataType::Int64)) {
                    (Some(i), true) => lit(i),
                    _ => lit(delta.as_f64().unwrap_or(f64::NAN)),
                };
                let expr = if op == "add" { col(name) + delta_lit } else { col(name) - delta_lit };
                *df = df.clone().lazy().with_column(expr.alias(name)).collect()?;
            }
            Some(other) => {
                return Err(AppError::unsupported(
                    "bad_operation",
                    format!("Unsupported operation '{}'.", other),
                ));
            }
        }
        Ok(df.clone())
    })?;

    ledger.update(id, "modified (column patch)")?;
    info!(target: "gridbase::engine", "apply_column_patch: id='{}', column='{}'", id, patch.column);
    Ok(result)
}

/// Uppercase the first letter of every word and lowercase the rest, word
/// boundaries being any non-alphabetic character.
fn title_case_column(df: &DataFrame, name: &str) -> AppResult<Series> {
    let ca = df.column(name)?.str()?;
    let mut vals: Vec<Option<String>> = Vec::with_capacity(ca.len());
    for opt in ca.iter() {
        vals.push(opt.map(title_case));
    }
    Ok(Series::new(name.into(), vals))
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
