use chrono::{DateTime, Utc};
use serde::Serialize;

use super::KeySource;

/// JSON envelope shared by every endpoint.
///
/// ```json
/// { "success": false, "message": "You need to pass a valid API key." }
/// ```
///
/// `data` and `err_code` are omitted when absent.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(rename = "errCode", skip_serializing_if = "Option::is_none")]
    pub err_code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response with a payload.
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            err_code: None,
        }
    }

    /// Failed response carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            err_code: None,
        }
    }

    /// Attach a machine-readable error code.
    pub fn with_err_code(mut self, code: impl Into<String>) -> Self {
        self.err_code = Some(code.into());
        self
    }
}

impl ApiResponse<()> {
    /// Successful response with no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            err_code: None,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Readiness response with per-backend status.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    /// `"ok"` or the data-layer error kind
    pub cache: String,
    /// `"ok"` or the data-layer error kind
    pub repository: String,
}

/// Payload of `GET /whoami`.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub authenticated: bool,
    pub key_source: KeySource,
}
