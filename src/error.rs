use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::ApiResponse;

/// Message returned when the request carries no API key.
pub const MSG_API_KEY_MISSING: &str = "API key is missing in request.";

/// Message returned when the presented key does not match the canonical key.
pub const MSG_API_KEY_INVALID: &str = "You need to pass a valid API key.";

/// Generic message returned when the cache or repository fails.
///
/// Deliberately vague: the caller learns nothing about the data layer.
pub const MSG_INVALID_VALUE_FORBIDDEN: &str = "Forbidden, invalid value.";

/// Closed classification of failures reported by the cache store and the
/// key repository.
///
/// Each backend maps its driver's error shapes onto one of these kinds so
/// that callers branch on a type instead of inspecting driver codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataLayerError {
    /// The backend could not be reached (pool exhausted, connection refused,
    /// I/O failure, timeout).
    #[error("data layer unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the value it was given (e.g. Postgres `22P02`).
    #[error("data layer rejected value: {0}")]
    InvalidValue(String),

    /// Any other backend failure.
    #[error("data layer failure: {0}")]
    Backend(String),
}

impl DataLayerError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DataLayerError::Unavailable(_) => "unavailable",
            DataLayerError::InvalidValue(_) => "invalid_value",
            DataLayerError::Backend(_) => "backend",
        }
    }
}

/// Why the key validator refused a request.
///
/// Every variant becomes a `403 Forbidden` with a `{success, message}` body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("API key is missing in request.")]
    MissingKey,

    #[error("You need to pass a valid API key.")]
    MismatchedKey,

    #[error(transparent)]
    DataLayer(#[from] DataLayerError),
}

impl Rejection {
    /// Client-facing message for this rejection.
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::MissingKey => MSG_API_KEY_MISSING,
            Rejection::MismatchedKey => MSG_API_KEY_INVALID,
            Rejection::DataLayer(_) => MSG_INVALID_VALUE_FORBIDDEN,
        }
    }

    /// Outcome label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Rejection::MissingKey => "missing_key",
            Rejection::MismatchedKey => "mismatched_key",
            Rejection::DataLayer(_) => "data_layer_failure",
        }
    }

    /// Whether this rejection is an unexpected internal failure rather than
    /// ordinary bad-credential traffic.
    pub fn is_internal(&self) -> bool {
        matches!(self, Rejection::DataLayer(_))
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            axum::Json(ApiResponse::<()>::failure(self.message())),
        )
            .into_response()
    }
}

/// Application-wide error types with appropriate HTTP status codes.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to connect to {backend}: {source}")]
    ConnectionFailed {
        backend: &'static str,
        #[source]
        source: DataLayerError,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::ConnectionFailed { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "A backing service is temporarily unavailable. Please try again later."
                    .to_string(),
            ),
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred. Please contact support if the issue persists."
                    .to_string(),
            ),
        };

        // Full detail stays server-side
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, axum::Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
