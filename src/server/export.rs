//! Download and export: serve the on-disk workbook, or rewrite it from the
//! live table first.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::server::AppState;
use crate::sheet;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn attachment(id: &str, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.xlsx\"", id),
            ),
        ],
        bytes,
    )
}

/// GET /download/{id} — the on-disk workbook as an attachment.
pub(crate) async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let path = state.upload_path(&id)?;
    if !path.exists() {
        return Err(AppError::not_found("file_not_found", "Modified file not found."));
    }
    let bytes = std::fs::read(&path)?;
    Ok(attachment(&id, bytes))
}

/// POST /export/{id} — write the live table to disk, record status
/// "exported", and return the file.
pub(crate) async fn export_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let df = state
        .store
        .snapshot(&id)
        .ok_or_else(|| AppError::session_not_found(&id))?;
    let path = state.upload_path(&id)?;
    sheet::xlsx::export(&df, &path)?;
    state.ledger.update(&id, "exported")?;
    info!(target: "gridbase::server", "export: id='{}', rows={}", id, df.height());
    let bytes = std::fs::read(&path)?;
    Ok(attachment(&id, bytes))
}
