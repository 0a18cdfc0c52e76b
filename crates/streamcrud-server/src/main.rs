//! Entry point for the collection mirror service.
//!
//! ```text
//! HTTP client --> Axum router --> Lookup / SyncEngine --> remote REST backend
//! ```
//!
//! The mirror is preloaded at startup unless `STREAMCRUD_PRELOAD=false`.

use std::sync::Arc;

use streamcrud_core::HttpTransport;
use streamcrud_server::{AppState, LogFormat, ServiceConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// Loads configuration from environment variables, initializes logging in
/// the configured format, builds the engine and lookup, then serves until
/// `Ctrl-C`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }

    info!("streamcrud-server starting");
    info!(
        remote_url = config.remote_url,
        resource_path = config.resource_path,
        retries = config.engine.retries,
        lookup_budget = config.lookup.budget,
        request_timeout_ms = config.request_timeout.as_millis(),
        "configuration loaded"
    );

    let transport = HttpTransport::with_timeout(&config.remote_url, config.request_timeout)?;
    let state = Arc::new(AppState::from_config(&config, transport));

    if config.preload {
        drop(state.engine.spawn_fetch_all(None, false));
        info!("initial fetch scheduled");
    }

    start_server(&config.server, state).await?;

    info!("streamcrud-server stopped");
    Ok(())
}
