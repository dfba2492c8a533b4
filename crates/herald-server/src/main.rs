// ============================================================================
// herald-server - HTTP backend for the Herald web frontend
// ============================================================================
// Configuration comes from the environment (.env supported). See
// HeraldConfig::from_env for the variables; HERALD_BIND_ADDR picks the port.
// ============================================================================

use anyhow::{Context, Result};
use herald_core::config::{load_dotenv, HeraldConfig};
use herald_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "herald_core=debug,herald_server=debug,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let config = HeraldConfig::from_env().context("Invalid configuration")?;
    if config.twitter.client_id.is_none() {
        tracing::warn!("CLIENT_ID is not set; /twitter/auth-url will fail");
    }

    let state = AppState::from_config(&config).context("Failed to initialize application state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    info!("Herald server listening on {}", config.server.bind_addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
