use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// A required configuration value is missing or unusable.
    Config(String),
    /// Error interacting with an external API (record store, uploads).
    ExternalApi(String),
    /// Internal server error.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ExternalApi(msg) => write!(f, "External API error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// The submission surface deliberately leaks nothing: every variant
    /// collapses to the same generic failure body, and the detail only
    /// reaches the server log.
    fn into_response(self) -> Response {
        match &self {
            AppError::Config(msg) => tracing::error!("Configuration error: {}", msg),
            AppError::ExternalApi(msg) => tracing::error!("External API error: {}", msg),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }

        let body = Json(json!({
            "ok": false,
            "error": "Submission failed",
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
