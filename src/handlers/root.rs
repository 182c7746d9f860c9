//! Endpoints behind the API key gate.

use axum::Extension;
use axum::Json;
use axum::http::Uri;

use crate::error::AppError;
use crate::models::{ApiResponse, KeySource, WhoAmIResponse};

/// `GET /` - greeting for callers with a valid key.
pub async fn index() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Hello from keygate!"))
}

/// `GET /whoami` - reports which source resolved the caller's key.
///
/// ```json
/// {
///   "success": true,
///   "message": "Authenticated",
///   "data": { "authenticated": true, "key_source": "cache_current" }
/// }
/// ```
pub async fn whoami(Extension(source): Extension<KeySource>) -> Json<ApiResponse<WhoAmIResponse>> {
    Json(ApiResponse::success(
        "Authenticated",
        WhoAmIResponse {
            authenticated: true,
            key_source: source,
        },
    ))
}

/// Fallback for unknown routes. Only reached with a valid key.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
