//! Prometheus metrics for the key gate.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `keygate_auth_decisions_total` - Admit/deny decisions (label: outcome)
//! - `keygate_cache_lookups_total` - Cache slot reads (labels: slot, result)
//! - `keygate_cache_writes_total` - Write-through cache writes (label: slot)
//! - `keygate_repository_lookups_total` - Repository queries (label: result)
//!
//! ## Histograms
//! - `keygate_validation_duration_seconds` - Time spent validating a key
//!
//! Recording functions are no-ops until [`init_metrics`] installs the
//! exporter, so tests can call them freely.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const AUTH_DECISIONS_TOTAL: &str = "keygate_auth_decisions_total";
    pub const CACHE_LOOKUPS_TOTAL: &str = "keygate_cache_lookups_total";
    pub const CACHE_WRITES_TOTAL: &str = "keygate_cache_writes_total";
    pub const REPOSITORY_LOOKUPS_TOTAL: &str = "keygate_repository_lookups_total";
    pub const VALIDATION_DURATION_SECONDS: &str = "keygate_validation_duration_seconds";
}

/// Install the Prometheus exporter listening on `metrics_addr`.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::AUTH_DECISIONS_TOTAL,
        "API key decisions by outcome (admitted, missing_key, mismatched_key, data_layer_failure)"
    );
    describe_counter!(
        names::CACHE_LOOKUPS_TOTAL,
        "Cache slot reads by slot and result (hit, miss, error)"
    );
    describe_counter!(
        names::CACHE_WRITES_TOTAL,
        "Write-through cache writes after a repository hit"
    );
    describe_counter!(
        names::REPOSITORY_LOOKUPS_TOTAL,
        "Key repository queries by result (found, not_found, error)"
    );
    describe_histogram!(
        names::VALIDATION_DURATION_SECONDS,
        "Time spent resolving and comparing an API key, in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_auth_decision(outcome: &'static str) {
    counter!(names::AUTH_DECISIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_cache_lookup(slot: &str, result: &'static str) {
    counter!(names::CACHE_LOOKUPS_TOTAL, "slot" => slot.to_string(), "result" => result)
        .increment(1);
}

pub fn record_cache_write(slot: &str) {
    counter!(names::CACHE_WRITES_TOTAL, "slot" => slot.to_string()).increment(1);
}

pub fn record_repository_lookup(result: &'static str) {
    counter!(names::REPOSITORY_LOOKUPS_TOTAL, "result" => result).increment(1);
}

pub fn record_validation_duration(outcome: &'static str, duration_secs: f64) {
    histogram!(names::VALIDATION_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}
