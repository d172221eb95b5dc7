//! Row-major JSON conversion for preview payloads. Datetimes emit ISO-8601
//! strings; missing values emit null.

use polars::prelude::*;
use serde_json::Value;

/// Up to `limit` rows of `df` as an array of `{column: value}` records; pass
/// None for all rows.
pub fn records(df: &DataFrame, limit: Option<usize>) -> Value {
    let cols = df.get_column_names();
    let take = limit.unwrap_or(df.height()).min(df.height());
    let mut out = Vec::with_capacity(take);
    for row_idx in 0..take {
        let mut map = serde_json::Map::with_capacity(cols.len());
        for c in &cols {
            let s = match df.column(c) {
                Ok(col) => col,
                Err(_) => {
                    map.insert(c.to_string(), Value::Null);
                    continue;
                }
            };
            let v = match s.get(row_idx) {
                Ok(AnyValue::Int64(v)) => serde_json::json!(v),
                Ok(AnyValue::Int32(v)) => serde_json::json!(v as i64),
                Ok(AnyValue::Float64(v)) => serde_json::json!(v),
                Ok(AnyValue::Boolean(v)) => serde_json::json!(v),
                Ok(AnyValue::String(v)) => serde_json::json!(v),
                Ok(AnyValue::StringOwned(v)) => serde_json::json!(v.as_str()),
                Ok(AnyValue::Datetime(ms, _, _)) | Ok(AnyValue::DatetimeOwned(ms, _, _)) => ms_to_iso(ms),
                Ok(AnyValue::Null) => Value::Null,
                _ => Value::Null,
            };
            map.insert(c.to_string(), v);
        }
        out.push(Value::Object(map));
    }
    Value::Array(out)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|c| c.to_string()).collect()
}

fn ms_to_iso(ms: i64) -> Value {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => Value::String(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_emit_typed_scalars_and_nulls() {
        let name = Series::new("name".into(), vec![Some("a"), None]);
        let n = Series::new("n".into(), vec![1i64, 2]);
        let seen = Series::new("seen".into(), vec![Some(0i64), None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![name.into(), n.into(), seen.into()]).unwrap();

        let v = records(&df, None);
        assert_eq!(
            v,
            json!([
                {"name": "a", "n": 1, "seen": "1970-01-01T00:00:00.000"},
                {"name": null, "n": 2, "seen": null},
            ])
        );
    }

    #[test]
    fn limit_bounds_the_output() {
        let n = Series::new("n".into(), vec![1i64, 2, 3]);
        let df = DataFrame::new(vec![n.into()]).unwrap();
        let v = records(&df, Some(2));
        assert_eq!(v.as_array().unwrap().len(), 2);
        let all = records(&df, Some(99));
        assert_eq!(all.as_array().unwrap().len(), 3);
    }
}
