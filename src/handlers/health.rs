//! Health and readiness endpoints (auth bypassed by default).
//!
//! - **Health** (`/health`): process is up; always 200
//! - **Readiness** (`/ready`): cache and repository answer a ping; 503 otherwise

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::{instrument, warn};

use crate::models::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}

/// Readiness check for orchestrator probes.
///
/// Both backends are pinged concurrently.
#[instrument(skip(state))]
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let (cache, repository) = tokio::join!(state.cache.ping(), state.repository.ping());

    let describe = |backend: &str, result: &Result<(), crate::error::DataLayerError>| match result {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            warn!(backend, error = %e, "Readiness ping failed");
            e.kind().to_string()
        }
    };

    let ready = cache.is_ok() && repository.is_ok();
    let body = ReadinessResponse {
        ready,
        cache: describe(state.cache.backend_name(), &cache),
        repository: describe(state.repository.backend_name(), &repository),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
