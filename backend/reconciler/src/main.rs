//! Real-estate chain mirror — entry point.
//!
//! Starts a background reconciler task that replays RealEstate contract
//! events from an Ethereum JSON-RPC node into SQLite, and serves a small
//! operational HTTP surface. The offer lifecycle manager
//! ([`lifecycle::LifecycleManager`]) is the library seam through which
//! command handlers mutate chain and mirror state.

mod abi;
mod api;
mod chain;
mod config;
mod db;
mod errors;
mod events;
mod lifecycle;
mod models;
mod reconciler;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use axum::{routing::get, Router};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chain::EthRpcClient;
use config::Config;
use reconciler::ReconcilerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client shared by the JSON-RPC chain client.
    let http = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let eth = EthRpcClient::new(http, &config);

    // ─── Background reconciler ───────────────────────────
    let reconciler_state = Arc::new(ReconcilerState {
        pool: pool.clone(),
        config: config.clone(),
        chain: eth,
    });
    tokio::spawn(reconciler::run(reconciler_state));

    // ─── Operational API ─────────────────────────────────
    let api_state = Arc::new(api::ApiState { pool });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/status", get(api::status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
