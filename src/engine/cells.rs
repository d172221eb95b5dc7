//! Cell patch engine: a batch of `(row, column, value)` edits against one
//! table. The batch is atomic — every update is validated (column known, row
//! in bounds, value coercible to the column dtype) before any cell is
//! written, so a bad update rejects the whole batch and the table stays
//! untouched.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::engine::TypedValue;
use crate::error::{AppError, AppResult};
use crate::session::SessionStore;

#[derive(Debug, Clone, Deserialize)]
pub struct CellUpdate {
    #[serde(default)]
    pub row: Option<i64>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub value: Value,
}

pub fn apply_cell_patches(store: &SessionStore, id: &str, updates: &[CellUpdate]) -> AppResult<()> {
    store.with_table(id, |df| {
        // Validate the whole batch first; edits keyed (column -> row -> value),
        // later updates to the same cell win.
        let mut edits: BTreeMap<String, BTreeMap<usize, TypedValue>> = BTreeMap::new();
        let height = df.height();
        for u in updates {
            let (Some(row), Some(column)) = (u.row, u.column.as_deref()) else {
                return Err(AppError::user("missing_field", "Missing row or column in update."));
            };
            let col_ok = df.get_column_names().iter().any(|c| c.as_str() == column);
            if !col_ok || row < 0 || row as usize >= height {
                return Err(AppError::user(
                    "bad_target",
                    format!("Invalid row index or column name: {}, {}", row, column),
                ));
            }
            let dt = df.column(column)?.dtype().clone();
            let typed = TypedValue::from_json(&dt, &u.value)?;
            edits.entry(column.to_string()).or_default().insert(row as usize, typed);
        }

        // One series rebuild per touched column
        for (column, cells) in &edits {
            let rebuilt = rebuild_column(df, column, cells)?;
            df.replace(column, rebuilt)?;
        }
        debug!(target: "gridbase::engine", "apply_cell_patches: id='{}', updates={}, columns={}", id, updates.len(), edits.len());
        Ok(())
    })
}

fn rebuild_column(df: &DataFrame, column: &str, cells: &BTreeMap<usize, TypedValue>) -> AppResult<Series> {
    let s = df.column(column)?;
    let len = s.len();
    let name: PlSmallStr = column.into();
    let out = match s.dtype() {
        DataType::Int64 => {
            let ca = s.i64()?;
            let mut vals: Vec<Option<i64>> = Vec::with_capacity(len);
            for i in 0..len {
                vals.push(match cells.get(&i) {
                    Some(TypedValue::Int(v)) => Some(*v),
                    Some(TypedValue::Null) => None,
                    Some(_) => None,
                    None => ca.get(i),
                });
            }
            Series::new(name, vals)
        }
        DataType::Float64 => {
            let ca = s.f64()?;
            let mut vals: Vec<Option<f64>> = Vec::with_capacity(len);
            for i in 0..len {
                vals.push(match cells.get(&i) {
                    Some(TypedValue::Float(v)) => Some(*v),
                    Some(TypedValue::Null) => None,
                    Some(_) => None,
                    None => ca.get(i),
                });
            }
            Series::new(name, vals)
        }
        DataType::Boolean => {
            let ca = s.bool()?;
            let mut vals: Vec<Option<bool>> = Vec::with_capacity(len);
            for i in 0..len {
                vals.push(match cells.get(&i) {
                    Some(TypedValue::Bool(v)) => Some(*v),
                    Some(TypedValue::Null) => None,
                    Some(_) => None,
                    None => ca.get(i),
                });
            }
            Series::new(name, vals)
        }
        DataType::Datetime(_, _) => {
            let mut vals: Vec<Option<i64>> = Vec::with_capacity(len);
            for i in 0..len {
                vals.push(match cells.get(&i) {
                    Some(TypedValue::DatetimeMs(v)) => Some(*v),
                    Some(TypedValue::Null) => None,
                    Some(_) => None,
                    None => match s.get(i) {
                        Ok(AnyValue::Datetime(ms, _, _)) => Some(ms),
                        Ok(AnyValue::DatetimeOwned(ms, _, _)) => Some(ms),
                        _ => None,
                    },
                });
            }
            Series::new(name, vals).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        _ => {
            let mut vals: Vec<Option<String>> = Vec::with_capacity(len);
            for i in 0..len {
                vals.push(match cells.get(&i) {
                    Some(TypedValue::Str(v)) => Some(v.clone()),
                    Some(TypedValue::Null) => None,
                    Some(_) => None,
                    None => match s.get(i) {
                        Ok(AnyValue::String(v)) => Some(v.to_string()),
                        Ok(AnyValue::StringOwned(v)) => Some(v.to_string()),
                        _ => None,
                    },
                });
            }
            Series::new(name, vals)
        }
    };
    Ok(out)
}
