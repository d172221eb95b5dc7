//! Mutation engines over the session store. One file per operation; this
//! root hosts the glue they share: JSON/text-to-dtype coercion, comparison
//! predicate construction, and sort plumbing.

use polars::prelude::*;
use serde_json::Value;

use crate::action::CmpOp;
use crate::error::{AppError, AppResult};

pub mod apply;
pub mod cells;
pub mod column;
pub mod filter;
pub mod sort;


pub(crate) fn known_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|c| c.to_string()).collect()
}

pub(crate) fn is_string_dtype(dt: &DataType) -> bool {
    matches!(dt, DataType::String)
}

pub(crate) fn is_numeric_dtype(dt: &DataType) -> bool {
    matches!(dt, DataType::Int64 | DataType::Float64)
}

fn cast_error(dt: &DataType) -> AppError {
    AppError::type_mismatch("cast", format!("Cannot cast value to column type {}", dt))
}

/// A client-supplied value coerced into a column's semantic type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypedValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Datetime as epoch milliseconds UTC.
    DatetimeMs(i64),
    Null,
}

impl TypedValue {
    /// Coerce a JSON scalar to `dt`. JSON null is accepted (it clears a cell);
    /// predicate builders reject it separately.
    pub(crate) fn from_json(dt: &DataType, v: &Value) -> AppResult<Self> {
        if v.is_null() {
            return Ok(TypedValue::Null);
        }
        match dt {
            DataType::Int64 => match v {
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Ok(TypedValue::Int(i))
                    } else {
                        Err(cast_error(dt))
                    }
                }
                Value::String(s) => s.trim().parse::<i64>().map(TypedValue::Int).map_err(|_| cast_error(dt)),
                _ => Err(cast_error(dt)),
            },
            DataType::Float64 => match v {
                Value::Number(n) => n.as_f64().map(TypedValue::Float).ok_or_else(|| cast_error(dt)),
                Value::String(s) => s.trim().parse::<f64>().map(TypedValue::Float).map_err(|_| cast_error(dt)),
                _ => Err(cast_error(dt)),
            },
            DataType::String => match v {
                Value::String(s) => Ok(TypedValue::Str(s.clone())),
                Value::Number(n) => Ok(TypedValue::Str(n.to_string())),
                Value::Bool(b) => Ok(TypedValue::Str(b.to_string())),
                _ => Err(cast_error(dt)),
            },
            DataType::Boolean => match v {
                Value::Bool(b) => Ok(TypedValue::Bool(*b)),
                Value::String(s) => parse_bool_text(s).map(TypedValue::Bool).ok_or_else(|| cast_error(dt)),
                _ => Err(cast_error(dt)),
            },
            DataType::Datetime(_, _) => match v {
                Value::Number(n) => n.as_i64().map(TypedValue::DatetimeMs).ok_or_else(|| cast_error(dt)),
                Value::String(s) => parse_datetime_text(s).map(TypedValue::DatetimeMs).ok_or_else(|| cast_error(dt)),
                _ => Err(cast_error(dt)),
            },
            _ => Err(cast_error(dt)),
        }
    }

    /// Coerce raw query-string text to `dt` (the filter preview path, where
    /// the value is always supplied as text).
    pub(crate) fn from_text(dt: &DataType, raw: &str) -> AppResult<Self> {
        match dt {
            DataType::Int64 => raw.trim().parse::<i64>().map(TypedValue::Int).map_err(|_| cast_error(dt)),
            DataType::Float64 => raw.trim().parse::<f64>().map(TypedValue::Float).map_err(|_| cast_error(dt)),
            DataType::String => Ok(TypedValue::Str(raw.to_string())),
            DataType::Boolean => parse_bool_text(raw).map(TypedValue::Bool).ok_or_else(|| cast_error(dt)),
            DataType::Datetime(_, _) => parse_datetime_text(raw).map(TypedValue::DatetimeMs).ok_or_else(|| cast_error(dt)),
            _ => Err(cast_error(dt)),
        }
    }

    fn to_lit(&self) -> Expr {
        match self {
            TypedValue::Int(v) => lit(*v),
            TypedValue::Float(v) => lit(*v),
            TypedValue::Str(v) => lit(v.clone()),
            TypedValue::Bool(v) => lit(*v),
            TypedValue::DatetimeMs(ms) => lit(*ms).cast(DataType::Datetime(TimeUnit::Milliseconds, None)),
            TypedValue::Null => lit(NULL),
        }
    }
}

fn parse_bool_text(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// ISO-8601 text to epoch milliseconds; a bare date reads as midnight UTC.
pub(crate) fn parse_datetime_text(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc().timestamp_millis());
        }
    }
    if let Ok(nd) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(nd.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

/// Build a `column op value` predicate expression. Null condition values and
/// ordered comparisons on boolean columns are type errors; null cells never
/// match the resulting predicate.
pub(crate) fn cmp_expr(dt: &DataType, column: &str, op: CmpOp, value: &TypedValue) -> AppResult<Expr> {
    if matches!(value, TypedValue::Null) {
        return Err(cast_error(dt));
    }
    if matches!(dt, DataType::Boolean) && op.is_ordering() {
        return Err(AppError::type_mismatch(
            "bool_order",
            format!("Ordered comparison is not supported on boolean column '{}'.", column),
        ));
    }
    let e = col(column);
    let l = value.to_lit();
    Ok(match op {
        CmpOp::Gt => e.gt(l),
        CmpOp::Lt => e.lt(l),
        CmpOp::Eq => e.eq(l),
        CmpOp::Ne => e.neq(l),
        CmpOp::Ge => e.gt_eq(l),
        CmpOp::Le => e.lt_eq(l),
    })
}

/// Stable sort on one column, nulls last.
pub(crate) fn sorted_by(df: &DataFrame, column: &str, ascending: bool) -> AppResult<DataFrame> {
    let opts = SortMultipleOptions {
        descending: vec![!ascending],
        nulls_last: vec![true],
        maintain_order: true,
        multithreaded: true,
        limit: None,
    };
    Ok(df.clone().lazy().sort_by_exprs(vec![col(column)], opts).collect()?)
}

/// Whole-column overwrite with one literal; the column's dtype becomes the
/// literal's dtype.
pub(crate) fn column_from_literal(name: &str, value: &Value, len: usize) -> AppResult<Series> {
    let s = match value {
        Value::Null => Series::new_null(name.into(), len),
        Value::Bool(b) => Series::new(name.into(), vec![*b; len]),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Series::new(name.into(), vec![i; len])
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Series::new(name.into(), vec![f; len])
            }
        }
        Value::String(v) => Series::new(name.into(), vec![v.as_str(); len]),
        _ => {
            return Err(AppError::user(
                "bad_value",
                "Column value must be a scalar (string, number, boolean, or null).",
            ))
        }
    };
    Ok(s)
}
