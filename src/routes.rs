//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← x-request-id set if absent, echoed on response
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← answers preflight before the key check
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   API key gate   │ ← 403 if missing/invalid (bypassed for /health, /ready)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Body limit     │
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::ApiKeyAuth;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let cors = build_cors_layer(&config.cors_allowed_origins);

    let auth = ApiKeyAuth::new(state.validator.clone(), config.auth_bypass_paths.clone());
    info!(
        bypass_paths = ?config.auth_bypass_paths,
        current_slot = %config.cache_slot_current,
        legacy_slot = %config.cache_slot_legacy,
        "API key gate enabled"
    );

    // Layers run in reverse order of application: the last one added sees
    // the request first.
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/", get(handlers::index))
        .route("/whoami", get(handlers::whoami))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(config.max_request_body_size))
        .layer(auth)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Build CORS layer from configuration.
///
/// `*` anywhere in the list allows any origin; otherwise unparsable origins
/// are skipped.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
