//! Live-table endpoints: previews, cell and column patches, filter and sort,
//! save, and session deletion.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::engine;
use crate::engine::cells::CellUpdate;
use crate::engine::column::ColumnPatch;
use crate::error::{AppError, AppResult};
use crate::server::AppState;
use crate::sheet;

const MAX_PREVIEW_ROWS: usize = 1000;

fn check_rows(rows: usize) -> AppResult<usize> {
    if (1..=MAX_PREVIEW_ROWS).contains(&rows) {
        Ok(rows)
    } else {
        Err(AppError::user(
            "bad_rows",
            format!("'rows' must be between 1 and {}.", MAX_PREVIEW_ROWS),
        ))
    }
}

#[derive(Deserialize)]
pub(crate) struct PreviewParams {
    #[serde(default = "default_preview_rows")]
    rows: usize,
}

fn default_preview_rows() -> usize {
    20
}

/// GET /data/{id}?rows=N — top rows of the live table.
pub(crate) async fn get_live_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PreviewParams>,
) -> AppResult<Json<Value>> {
    let rows = check_rows(params.rows)?;
    let df = state
        .store
        .snapshot(&id)
        .ok_or_else(|| AppError::session_not_found(&id))?;
    Ok(Json(json!({
        "file_id": id,
        "rows": sheet::json::records(&df, Some(rows)),
    })))
}

/// GET /data/{id}/preview — all rows plus column names.
pub(crate) async fn get_full_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let df = state
        .store
        .snapshot(&id)
        .ok_or_else(|| AppError::session_not_found(&id))?;
    Ok(Json(json!({
        "file_id": id,
        "rows": sheet::json::records(&df, None),
        "columns": sheet::json::column_names(&df),
    })))
}

#[derive(Deserialize)]
pub(crate) struct PatchRequest {
    updates: Vec<CellUpdate>,
}

/// PATCH /data/{id} — apply a batch of cell edits in memory.
pub(crate) async fn patch_cells(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<PatchRequest>,
) -> AppResult<Json<Value>> {
    engine::cells::apply_cell_patches(&state.store, &id, &patch.updates)?;
    Ok(Json(json!({
        "file_id": id,
        "message": "Updates applied in memory.",
    })))
}

/// POST /data/{id}/save — export the live table over the on-disk upload and
/// record status "modified".
pub(crate) async fn save_live_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let df = state
        .store
        .snapshot(&id)
        .ok_or_else(|| AppError::session_not_found(&id))?;
    sheet::xlsx::export(&df, &state.upload_path(&id)?)?;
    state.ledger.update(&id, "modified")?;
    info!(target: "gridbase::server", "save: id='{}', rows={}", id, df.height());
    Ok(Json(json!({
        "file_id": id,
        "message": "Live data saved to disk.",
    })))
}

/// PATCH /data/{id}/column — one column-wide transform; responds with a
/// first-10-row preview so the effect is immediately observable.
pub(crate) async fn patch_column(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ColumnPatch>,
) -> AppResult<Json<Value>> {
    let df = engine::column::apply_column_patch(&state.store, &state.ledger, &id, &patch)?;
    Ok(Json(json!({
        "file_id": id,
        "message": "Column updated.",
        "preview": sheet::json::records(&df, Some(10)),
    })))
}

#[derive(Deserialize)]
pub(crate) struct FilterParams {
    column: String,
    #[serde(default = "default_operator")]
    operator: String,
    value: String,
    #[serde(default = "default_filter_rows")]
    rows: usize,
}

fn default_operator() -> String {
    "==".to_string()
}

fn default_filter_rows() -> usize {
    100
}

/// GET /data/{id}/filter — read-only filter preview: total match count plus
/// a bounded slice of matching rows.
pub(crate) async fn filter_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<FilterParams>,
) -> AppResult<Json<Value>> {
    let rows = check_rows(params.rows)?;
    let preview = engine::filter::filter_preview(
        &state.store,
        &id,
        &params.column,
        &params.operator,
        &params.value,
        rows,
    )?;
    Ok(Json(json!({
        "file_id": id,
        "filter": {
            "column": params.column,
            "operator": params.operator,
            "value": params.value,
        },
        "count": preview.count,
        "rows": sheet::json::records(&preview.rows, None),
    })))
}

#[derive(Deserialize)]
pub(crate) struct SortParams {
    column: String,
    #[serde(default = "default_order")]
    order: String,
    #[serde(default = "default_filter_rows")]
    rows: usize,
    #[serde(default)]
    persist: bool,
}

fn default_order() -> String {
    "asc".to_string()
}

/// GET /data/{id}/sort — sorted preview; persist=true commits the sorted
/// table back into the session store.
pub(crate) async fn sort_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SortParams>,
) -> AppResult<Json<Value>> {
    let rows = check_rows(params.rows)?;
    let sorted = engine::sort::sort_preview(
        &state.store,
        &state.ledger,
        &id,
        &params.column,
        &params.order,
        rows,
        params.persist,
    )?;
    Ok(Json(json!({
        "file_id": id,
        "sort": {
            "column": params.column,
            "order": params.order,
            "persist": params.persist,
        },
        "rows": sheet::json::records(&sorted, None),
    })))
}

/// DELETE /data/{id} — drop the live session. The ledger entry persists
/// independently, so deletion itself is a recorded status.
pub(crate) async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    if !state.store.remove(&id) {
        return Err(AppError::session_not_found(&id));
    }
    state.ledger.update(&id, "deleted")?;
    info!(target: "gridbase::server", "delete: id='{}'", id);
    Ok(Json(json!({
        "file_id": id,
        "message": "Session deleted.",
    })))
}
