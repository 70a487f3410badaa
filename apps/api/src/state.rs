use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::pipeline::RunRegistry;
use crate::analysis::weights::ScoringWeights;
use crate::config::Config;
use crate::llm_client::LanguageModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// The gateway seam — production uses `AnthropicClient`, tests script it.
    pub llm: Arc<dyn LanguageModel>,
    pub config: Config,
    /// Tuning constants for every scorer in the pipeline. Defaults shipped,
    /// threaded everywhere so nothing hardcodes a weight per call.
    pub weights: Arc<ScoringWeights>,
    /// At-most-one in-flight pipeline run per (cv, company) key.
    pub runs: Arc<RunRegistry>,
}
