//! Duka Pay API server entrypoint.
//!
//! Reads configuration from the environment, wires the in-memory
//! correlation store, gateway client, and fulfillment orchestrator, and
//! serves the payment API. Storage is in-memory with no persistence —
//! payment records are lost on restart.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use duka_api::config::AppConfig;
use duka_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("configuration error")?;
    let port = config.port;
    let state = AppState::from_config(&config).context("failed to wire application state")?;
    let app = duka_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("duka-api listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}
