//!
//! gridbase HTTP server
//! --------------------
//! Axum-based HTTP API over the session store and mutation engines.
//!
//! Responsibilities:
//! - Upload handling: multipart .xlsx intake, UUID identifiers, import into
//!   the session store.
//! - Live-table endpoints: previews, cell/column patches, filter and sort
//!   (preview or commit), save/export/download, deletion.
//! - Natural-language actions: translate a prompt, validate the descriptor,
//!   apply it, echo the applied action.
//! - Status endpoint over the per-file ledger.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::StatusLedger;
use crate::session::SessionStore;
use crate::translate::{ActionTranslator, RuleTranslator};

mod action;
mod data;
mod export;
mod status;
mod upload;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub ledger: StatusLedger,
    pub translator: Arc<dyn ActionTranslator>,
    /// One spreadsheet file per session lives here, named `<id>.xlsx`.
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(data_root: &std::path::Path) -> Self {
        Self {
            store: SessionStore::new(),
            ledger: StatusLedger::new(data_root.join("file_statuses.json")),
            translator: Arc::new(RuleTranslator::new()),
            uploads_dir: data_root.join("uploads"),
        }
    }

    /// Identifiers are UUIDs minted at upload time. Parsing the id here keeps
    /// a path-shaped segment in `/download/{id}` and friends from escaping the
    /// uploads directory.
    pub fn upload_path(&self, id: &str) -> AppResult<PathBuf> {
        let id = Uuid::parse_str(id).map_err(|_| AppError::session_not_found(id))?;
        Ok(self.uploads_dir.join(format!("{}.xlsx", id)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "gridbase ok" }))
        .route("/upload", post(upload::upload_sheet))
        .route("/preview-sheet/{id}", get(upload::preview_sheet))
        .route("/data/{id}", get(data::get_live_data).patch(data::patch_cells).delete(data::delete_session))
        .route("/data/{id}/preview", get(data::get_full_preview))
        .route("/data/{id}/save", post(data::save_live_data))
        .route("/data/{id}/column", patch(data::patch_column))
        .route("/data/{id}/filter", get(data::filter_data))
        .route("/data/{id}/sort", get(data::sort_data))
        .route("/generate-formula", post(action::generate_formula))
        .route("/generate-action", post(action::generate_action))
        .route("/status/{id}", get(status::get_file_status))
        .route("/download/{id}", get(export::download_file))
        .route("/export/{id}", post(export::export_file))
        .with_state(state)
}

/// Start the gridbase HTTP server bound to the given port, with all on-disk
/// state under `data_root`.
pub async fn run_with_port(http_port: u16, data_root: &str) -> anyhow::Result<()> {
    let root = PathBuf::from(data_root);
    std::fs::create_dir_all(root.join("uploads"))?;

    let state = AppState::new(&root);
    info!(
        target: "gridbase::server",
        "state ready: uploads_dir='{}', ledger='{}'",
        state.uploads_dir.display(),
        state.ledger.path().display()
    );
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point using default port 8080 and data root "data".
pub async fn run() -> anyhow::Result<()> {
    run_with_port(8080, "data").await
}
