//! Status endpoint over the per-file ledger.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::server::AppState;

/// GET /status/{id} — the last recorded status; the sentinel maps to 404.
pub(crate) async fn get_file_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let record = state.ledger.get(&id)?;
    if record.status == "not_found" {
        return Err(AppError::not_found("status_not_found", "File status not found."));
    }
    Ok(Json(json!({
        "status": record.status,
        "timestamp": record.timestamp,
    })))
}
