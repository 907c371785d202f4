//! Campaign API entry point.
//!
//! Serves the crowdfunding campaign REST API over Axum. Campaign state is
//! persisted to SQLite and every contribution or edit goes through the
//! version-checked commit loop in `funding_engine`.

mod api;
mod config;
mod db;
mod errors;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use funding_engine::{CampaignService, SystemClock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url, 5).await?;
    let store = Arc::new(db::SqliteCampaignStore::new(pool));
    let service = CampaignService::new(store, config.retry_policy());

    let api_state = Arc::new(api::ApiState {
        service,
        clock: Arc::new(SystemClock),
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route(
            "/campaigns",
            get(api::list_campaigns).post(api::create_campaign),
        )
        .route(
            "/campaigns/:id",
            get(api::get_campaign).patch(api::edit_campaign),
        )
        .route("/campaigns/:id/contributions", post(api::contribute))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
