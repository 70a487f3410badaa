use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Analysis already in progress: {0}")]
    RunInProgress(String),

    #[error("Invalid gateway response format: {0}")]
    InvalidResponseFormat(String),

    #[error("Inconsistent comparison: {0}")]
    InconsistentComparison(String),

    #[error("Analyzer '{dimension}' failed: {message}")]
    AnalyzerFailure { dimension: String, message: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps a gateway error onto the error taxonomy: unparseable or empty
    /// output is a format error (never a silent default), everything else
    /// surfaces as a gateway failure.
    pub fn from_gateway(err: LlmError) -> Self {
        match err {
            LlmError::Parse(e) => AppError::InvalidResponseFormat(e.to_string()),
            LlmError::EmptyContent => {
                AppError::InvalidResponseFormat("gateway returned no text content".to_string())
            }
            other => AppError::Gateway(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::EmptyInput(msg) => (StatusCode::BAD_REQUEST, "EMPTY_INPUT", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::RunInProgress(msg) => (StatusCode::CONFLICT, "RUN_IN_PROGRESS", msg.clone()),
            AppError::InvalidResponseFormat(msg) => {
                tracing::error!("Invalid gateway response: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "INVALID_RESPONSE_FORMAT",
                    msg.clone(),
                )
            }
            AppError::InconsistentComparison(msg) => {
                tracing::error!("Inconsistent comparison: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "INCONSISTENT_COMPARISON",
                    msg.clone(),
                )
            }
            AppError::AnalyzerFailure { dimension, message } => {
                tracing::error!("Analyzer '{dimension}' failed: {message}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYZER_FAILURE",
                    format!("analyzer '{dimension}' failed"),
                )
            }
            AppError::InsufficientData(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_DATA",
                msg.clone(),
            ),
            AppError::Gateway(msg) => {
                tracing::error!("Gateway error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GATEWAY_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERIALIZATION_ERROR",
                    "A serialization error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
