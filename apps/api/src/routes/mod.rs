pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Skill extraction
        .route(
            "/api/v1/skills/extract",
            post(handlers::handle_extract_skills),
        )
        // Analysis API
        .route("/api/v1/analysis/compare", post(handlers::handle_compare))
        .route(
            "/api/v1/analysis/components",
            post(handlers::handle_run_components),
        )
        .route(
            "/api/v1/analysis/:company/results",
            get(handlers::handle_get_results),
        )
        .route(
            "/api/v1/analysis/:company/runs",
            get(handlers::handle_list_runs),
        )
        .route(
            "/api/v1/analysis/:company/pipeline",
            post(handlers::handle_trigger_pipeline),
        )
        .route(
            "/api/v1/analysis/:company/pipeline/sync",
            post(handlers::handle_trigger_pipeline_sync),
        )
        .with_state(state)
}
