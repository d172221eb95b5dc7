//! Spreadsheet I/O: .xlsx import/export for the table representation, plus
//! row-major JSON conversion used by every preview payload.

use thiserror::Error;

use crate::error::AppError;

pub mod json;
pub mod xlsx;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("workbook has no sheets")]
    EmptyWorkbook,

    #[error("sheet '{0}' has no header row")]
    MissingHeader(String),

    #[error("{0}")]
    Read(#[from] calamine::Error),

    #[error("{0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Table(#[from] polars::prelude::PolarsError),
}

impl From<SheetError> for AppError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::EmptyWorkbook | SheetError::MissingHeader(_) | SheetError::Read(_) => {
                AppError::user("bad_workbook", err.to_string())
            }
            SheetError::Io(e) => AppError::io("sheet_io", e.to_string()),
            SheetError::Write(e) => AppError::internal("sheet_write", e.to_string()),
            SheetError::Table(e) => AppError::internal("table_error", e.to_string()),
        }
    }
}
