use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port: u16 = std::env::var("GRIDBASE_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let data_root = std::env::var("GRIDBASE_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    info!(
        target: "gridbase",
        "gridbase starting: RUST_LOG='{}', http_port={}, data_root='{}'",
        rust_log, http_port, data_root
    );

    gridbase::server::run_with_port(http_port, &data_root).await
}
