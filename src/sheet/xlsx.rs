//! Workbook reading and writing. calamine parses workbooks; rust_xlsxwriter
//! produces them. Import takes the first sheet, treats the first row as
//! headers, and infers one semantic type per column.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDateTime;
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use serde_json::{json, Value};
use tracing::debug;

use super::SheetError;

/// How a single cell reads, before per-column aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Missing,
    Int,
    Float,
    Text,
    Bool,
    Datetime,
}

fn classify(cell: &Data) -> CellKind {
    match cell {
        Data::Empty => CellKind::Missing,
        Data::Int(_) => CellKind::Int,
        Data::Float(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                CellKind::Int
            } else {
                CellKind::Float
            }
        }
        Data::String(_) => CellKind::Text,
        Data::Bool(_) => CellKind::Bool,
        Data::DateTime(dt) => {
            if dt.as_datetime().is_some() {
                CellKind::Datetime
            } else {
                CellKind::Text
            }
        }
        Data::DateTimeIso(s) => {
            if crate::engine::parse_datetime_text(s).is_some() {
                CellKind::Datetime
            } else {
                CellKind::Text
            }
        }
        Data::DurationIso(_) | Data::Error(_) => CellKind::Text,
    }
}

/// First-row headers: empty cells become `column_<n>`, duplicates get `_2`,
/// `_3`… suffixes.
fn header_names(row: &[Data]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(row.len());
    for (i, cell) in row.iter().enumerate() {
        let raw = match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.trim().to_string(),
            other => cell_to_text(other),
        };
        let base = if raw.is_empty() { format!("column_{}", i + 1) } else { raw };
        let mut name = base.clone();
        let mut n = 2;
        while out.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        out.push(name);
    }
    out
}

fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|ndt| ndt.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{:?}", e),
    }
}

fn cell_to_datetime_ms(cell: &Data) -> Option<i64> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| ndt.and_utc().timestamp_millis()),
        Data::DateTimeIso(s) => crate::engine::parse_datetime_text(s),
        _ => None,
    }
}

/// Load the first sheet of the workbook at `path` into a typed table.
pub fn import(path: &Path) -> Result<DataFrame, SheetError> {
    let mut wb = open_workbook_auto(path)?;
    let sheet_names = wb.sheet_names().to_owned();
    let first = sheet_names.first().cloned().ok_or(SheetError::EmptyWorkbook)?;
    let range = wb.worksheet_range(&first)?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| SheetError::MissingHeader(first.clone()))?;
    let headers = header_names(header_row);
    let body: Vec<&[Data]> = rows.collect();

    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (j, name) in headers.iter().enumerate() {
        let cells: Vec<&Data> = body.iter().map(|r| r.get(j).unwrap_or(&Data::Empty)).collect();
        columns.push(build_column(name, &cells)?.into());
    }
    let df = DataFrame::new(columns)?;
    debug!(target: "gridbase::sheet", "import: path='{}', columns={}, rows={}", path.display(), df.width(), df.height());
    Ok(df)
}

fn build_column(name: &str, cells: &[&Data]) -> Result<Series, SheetError> {
    let kinds: Vec<CellKind> = cells.iter().map(|c| classify(c)).collect();
    let present: Vec<CellKind> = kinds.iter().copied().filter(|k| *k != CellKind::Missing).collect();

    let all = |k: CellKind| present.iter().all(|p| *p == k);
    let all_numeric = present.iter().all(|p| matches!(p, CellKind::Int | CellKind::Float));

    let pl_name: PlSmallStr = name.into();
    let s = if present.is_empty() {
        // All-empty column: string with every value null
        Series::new_null(pl_name, cells.len()).cast(&DataType::String)?
    } else if all_numeric && all(CellKind::Int) {
        let vals: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i),
                Data::Float(n) => Some(*n as i64),
                _ => None,
            })
            .collect();
        Series::new(pl_name, vals)
    } else if all_numeric {
        let vals: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i as f64),
                Data::Float(n) => Some(*n),
                _ => None,
            })
            .collect();
        Series::new(pl_name, vals)
    } else if all(CellKind::Bool) {
        let vals: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Data::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        Series::new(pl_name, vals)
    } else if all(CellKind::Datetime) {
        let vals: Vec<Option<i64>> = cells.iter().map(|c| cell_to_datetime_ms(c)).collect();
        Series::new(pl_name, vals).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
    } else {
        // Mixed columns stringify every present value
        let vals: Vec<Option<String>> = cells
            .iter()
            .map(|c| match c {
                Data::Empty => None,
                other => Some(cell_to_text(other)),
            })
            .collect();
        Series::new(pl_name, vals)
    };
    Ok(s)
}

/// Write `df` as a single-sheet workbook: header row, then typed cells.
/// Datetimes carry a `yyyy-mm-dd hh:mm:ss` number format so they round-trip
/// as datetime cells; nulls are blank.
pub fn export(df: &DataFrame, path: &Path) -> Result<(), SheetError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet();
    let datetime_fmt = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (c, name) in df.get_column_names().iter().enumerate() {
        worksheet.write_string(0, c as u16, name.as_str())?;
    }
    for (c, column) in df.get_columns().iter().enumerate() {
        let col16 = c as u16;
        for r in 0..df.height() {
            let row32 = (r + 1) as u32;
            match column.get(r) {
                Ok(AnyValue::Null) | Err(_) => {}
                Ok(AnyValue::Int64(v)) => {
                    worksheet.write_number(row32, col16, v as f64)?;
                }
                Ok(AnyValue::Float64(v)) => {
                    worksheet.write_number(row32, col16, v)?;
                }
                Ok(AnyValue::Boolean(v)) => {
                    worksheet.write_boolean(row32, col16, v)?;
                }
                Ok(AnyValue::String(v)) => {
                    worksheet.write_string(row32, col16, v)?;
                }
                Ok(AnyValue::StringOwned(v)) => {
                    worksheet.write_string(row32, col16, v.as_str())?;
                }
                Ok(AnyValue::Datetime(ms, _, _)) | Ok(AnyValue::DatetimeOwned(ms, _, _)) => {
                    if let Some(ndt) = ms_to_naive(ms) {
                        worksheet.write_datetime_with_format(row32, col16, &ndt, &datetime_fmt)?;
                    }
                }
                Ok(other) => {
                    worksheet.write_string(row32, col16, &other.to_string())?;
                }
            }
        }
    }
    workbook.save(path)?;
    debug!(target: "gridbase::sheet", "export: path='{}', rows={}", path.display(), df.height());
    Ok(())
}

fn ms_to_naive(ms: i64) -> Option<NaiveDateTime> {
    chrono::DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

#[derive(Debug)]
pub struct SheetPreview {
    pub sheets: Vec<String>,
    pub headers: Vec<String>,
    /// Up to 5 body rows; missing cells render as "".
    pub sample: Vec<Vec<Value>>,
}

/// On-disk preview of a workbook: sheet names, header row, and a small
/// sample of the first sheet.
pub fn preview(path: &Path) -> Result<SheetPreview, SheetError> {
    let mut wb = open_workbook_auto(path)?;
    let sheets = wb.sheet_names().to_owned();
    let first = sheets.first().cloned().ok_or(SheetError::EmptyWorkbook)?;
    let range = wb.worksheet_range(&first)?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| SheetError::MissingHeader(first.clone()))?;
    let headers = header_names(header_row);

    let mut sample: Vec<Vec<Value>> = Vec::new();
    for row in rows.take(5) {
        let cells = row
            .iter()
            .map(|c| match c {
                Data::Empty => json!(""),
                Data::String(s) => json!(s),
                Data::Int(i) => json!(i),
                Data::Float(n) => json!(n),
                Data::Bool(b) => json!(b),
                other => json!(cell_to_text(other)),
            })
            .collect();
        sample.push(cells);
    }
    Ok(SheetPreview { sheets, headers, sample })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_df() -> DataFrame {
        let name = Series::new("Name".into(), vec![Some("ada"), Some("grace"), None]);
        let count = Series::new("Count".into(), vec![Some(1i64), Some(2), Some(3)]);
        let score = Series::new("Score".into(), vec![Some(0.5f64), None, Some(2.25)]);
        let active = Series::new("Active".into(), vec![Some(true), Some(false), None]);
        let seen = Series::new("Seen".into(), vec![Some(1_700_000_000_000i64), Some(1_700_086_400_000), None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        DataFrame::new(vec![name.into(), count.into(), score.into(), active.into(), seen.into()]).unwrap()
    }

    #[test]
    fn export_import_roundtrips_names_dtypes_and_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("roundtrip.xlsx");
        let df = fixture_df();
        export(&df, &path).unwrap();

        let back = import(&path).unwrap();
        assert_eq!(back.height(), 3);
        let names: Vec<String> = back.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["Name", "Count", "Score", "Active", "Seen"]);
        assert_eq!(back.column("Name").unwrap().dtype(), &DataType::String);
        assert_eq!(back.column("Count").unwrap().dtype(), &DataType::Int64);
        assert_eq!(back.column("Score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(back.column("Active").unwrap().dtype(), &DataType::Boolean);
        assert!(matches!(back.column("Seen").unwrap().dtype(), DataType::Datetime(_, _)));

        assert_eq!(back.column("Count").unwrap().i64().unwrap().get(1), Some(2));
        assert_eq!(back.column("Score").unwrap().f64().unwrap().get(2), Some(2.25));
        assert_eq!(back.column("Name").unwrap().str().unwrap().get(2), None);
    }

    #[test]
    fn preview_reports_sheets_headers_and_sample() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("preview.xlsx");
        export(&fixture_df(), &path).unwrap();

        let p = preview(&path).unwrap();
        assert_eq!(p.sheets.len(), 1);
        assert_eq!(p.headers, vec!["Name", "Count", "Score", "Active", "Seen"]);
        assert_eq!(p.sample.len(), 3);
        // Missing cells render as ""
        assert_eq!(p.sample[2][0], json!(""));
    }

    #[test]
    fn duplicate_and_empty_headers_are_normalized() {
        let row = vec![
            Data::String("A".into()),
            Data::String("A".into()),
            Data::Empty,
            Data::String("A".into()),
        ];
        assert_eq!(header_names(&row), vec!["A", "A_2", "column_3", "A_3"]);
    }

    #[test]
    fn mixed_column_stringifies_all_present_values() {
        let one = Data::Int(1);
        let txt = Data::String("x".into());
        let empty = Data::Empty;
        let s = build_column("m", &[&one, &txt, &empty]).unwrap();
        assert_eq!(s.dtype(), &DataType::String);
        assert_eq!(s.str().unwrap().get(0), Some("1"));
        assert_eq!(s.str().unwrap().get(2), None);
    }
}
