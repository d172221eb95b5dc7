//! Upload intake and on-disk workbook preview.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::server::AppState;
use crate::sheet;

/// POST /upload — multipart field `file` must be an .xlsx workbook. Writes
/// the bytes to the uploads directory under a fresh UUID, imports the first
/// sheet into the session store, and records status "uploaded".
pub(crate) async fn upload_sheet(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut payload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::user("bad_multipart", e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::user("bad_multipart", e.to_string()))?;
            payload = Some((filename, bytes.to_vec()));
            break;
        }
    }
    let Some((filename, bytes)) = payload else {
        return Err(AppError::user("missing_file", "Multipart field 'file' is required."));
    };
    if !filename.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(AppError::user("bad_extension", "Only .xlsx files are supported."));
    }
    if bytes.is_empty() {
        return Err(AppError::user("empty_file", "Uploaded file is empty."));
    }

    let id = Uuid::new_v4().to_string();
    let path = state.upload_path(&id)?;
    std::fs::write(&path, &bytes)?;

    let df = sheet::xlsx::import(&path)?;
    let columns = sheet::json::column_names(&df);
    let rows = df.height();
    state.store.put(&id, df);
    state.ledger.update(&id, "uploaded")?;
    info!(target: "gridbase::server", "upload: id='{}', file='{}', rows={}", id, filename, rows);

    Ok(Json(json!({
        "file_id": id,
        "columns": columns,
        "rows": rows,
        "message": "File uploaded successfully",
    })))
}

/// GET /preview-sheet/{id} — parse the on-disk upload without touching the
/// live session: sheet names, headers, and a 5-row sample.
pub(crate) async fn preview_sheet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let path = state.upload_path(&id)?;
    if !path.exists() {
        return Err(AppError::not_found("file_not_found", "File not found."));
    }
    let p = sheet::xlsx::preview(&path)?;
    Ok(Json(json!({
        "sheets": p.sheets,
        "headers": p.headers,
        "sample": p.sample,
    })))
}
