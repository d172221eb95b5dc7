//! Natural-language action endpoint: translate a prompt into a descriptor,
//! validate and apply it, and echo the applied action.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::engine;
use crate::error::{AppError, AppResult};
use crate::server::AppState;
use crate::sheet;

#[derive(Deserialize)]
pub(crate) struct PromptRequest {
    file_id: String,
    prompt: String,
}

/// POST /generate-formula — translate a prompt against the session's columns
/// and echo the raw descriptor without applying it or touching the ledger.
pub(crate) async fn generate_formula(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> AppResult<Json<Value>> {
    let df = state
        .store
        .snapshot(&request.file_id)
        .ok_or_else(|| AppError::session_not_found(&request.file_id))?;
    let columns = sheet::json::column_names(&df);

    let descriptor = state
        .translator
        .translate(&request.prompt, &columns)
        .map_err(|e| AppError::user("translator", e.to_string()))?;
    info!(target: "gridbase::server", "generate_formula: id='{}'", request.file_id);

    Ok(Json(json!({ "formula": descriptor })))
}

/// POST /generate-action. Translator failures map to 400; an absent session
/// to 404; validator rejections to 422; anything else to 500.
pub(crate) async fn generate_action(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> AppResult<Json<Value>> {
    let df = state
        .store
        .snapshot(&request.file_id)
        .ok_or_else(|| AppError::session_not_found(&request.file_id))?;
    let columns = sheet::json::column_names(&df);

    let descriptor = state
        .translator
        .translate(&request.prompt, &columns)
        .map_err(|e| AppError::user("translator", e.to_string()))?;

    let applied = engine::apply::apply_action(&state.store, &state.ledger, &request.file_id, &descriptor)?;
    info!(target: "gridbase::server", "generate_action: id='{}'", request.file_id);

    Ok(Json(json!({
        "message": "Action applied successfully",
        "action": applied,
    })))
}
