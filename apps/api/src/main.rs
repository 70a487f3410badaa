mod analysis;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::pipeline::RunRegistry;
use crate::analysis::weights::ScoringWeights;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{AnthropicClient, ModelSelection};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skillfit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize the LLM gateway — model selection is fixed here for the
    // whole process, never mutated at runtime
    let selection = ModelSelection {
        model: config.llm_model.clone(),
        ..ModelSelection::default()
    };
    let llm = AnthropicClient::new(
        config.anthropic_api_key.clone(),
        selection,
        config.gateway_timeout_secs,
    );
    info!("LLM gateway initialized (model: {})", llm.model());

    // Scoring weights: shipped defaults (see analysis::weights)
    let weights = Arc::new(ScoringWeights::default());

    // Build app state
    let state = AppState {
        db,
        llm: Arc::new(llm),
        config: config.clone(),
        weights,
        runs: Arc::new(RunRegistry::new()),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
