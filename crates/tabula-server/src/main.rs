//! Tabula server
//!
//! Loads datasets from the configured data directory and serves queries over
//! them as JSON.

use anyhow::Context;
use std::sync::Arc;
use tabula_server::{logging, router, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("TABULA_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path).with_context(|| format!("loading {}", config_path))?;
    config.apply_logging_env();
    logging::init();

    let registry = config
        .load_registry()
        .with_context(|| format!("loading datasets from {}", config.data.directory))?;

    let state = AppState {
        registry: Arc::new(registry),
        paging: config.query.clone(),
    };
    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(%addr, "Tabula server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
