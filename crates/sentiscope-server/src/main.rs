//! Sentiscope server binary.

use sentiscope_engine::SentimentEngine;
use sentiscope_server::config::API_TOKEN_ENV;
use sentiscope_server::{
    build_router, init_logging, load_config, shutdown_engine, AppState, ServerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: from CLI arg, env var, or default
    let (config, source) = load_server_config()?;
    let config = config.with_api_token_override(std::env::var(API_TOKEN_ENV).ok());

    init_logging(&config.logging)?;
    match source {
        Some(path) => info!(path = %path.display(), "Loaded configuration from file"),
        None => info!("No config file specified, using defaults"),
    }

    let engine = Arc::new(SentimentEngine::new(&config.engine)?);
    info!(
        listen_addr = %config.listen_addr,
        backend = engine.backend_name(),
        batch_size = config.engine.batch.size,
        cooldown_ms = config.engine.batch.cooldown_ms,
        "Starting sentiscope server"
    );

    let app = build_router(Arc::new(AppState {
        engine: Arc::clone(&engine),
    }));
    let token = CancellationToken::new();
    tokio::spawn(shutdown_engine(Arc::clone(&engine), token.clone()));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(listen_addr = %config.listen_addr, "Sentiscope server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    info!("Sentiscope server stopped");
    Ok(())
}

/// Load configuration from the first CLI argument, `SENTISCOPE_CONFIG`, or
/// fall back to defaults. Returns the path that was used, if any.
fn load_server_config() -> anyhow::Result<(ServerConfig, Option<PathBuf>)> {
    let config_path: Option<PathBuf> = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SENTISCOPE_CONFIG").ok())
        .map(PathBuf::from);

    match config_path {
        Some(path) => Ok((load_config(&path)?, Some(path))),
        None => Ok((ServerConfig::default(), None)),
    }
}
