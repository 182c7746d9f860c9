use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use keygate::config::LogFormat;
use keygate::{AppState, Config, build_router, metrics, shutdown};

#[tokio::main]
async fn main() -> ExitCode {
    // Configuration is read before logging so LOG_FORMAT and RUST_LOG take
    // effect; errors are reported once the subscriber is up.
    let config = Config::from_env();
    match &config {
        Ok(c) => init_tracing(c.log_format, &c.log_level),
        Err(_) => init_tracing(LogFormat::default(), "info"),
    }

    info!("Starting keygate v{}", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        redis = config.redis_url.is_some(),
        postgres = config.database_url.is_some(),
        log_format = %config.log_format,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;

    let state = AppState::from_config(config).await.map_err(|e| {
        error!("Failed to initialize key backends: {e}");
        exitcode::UNAVAILABLE
    })?;
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("  GET /health  - Liveness (no key required)");
    info!("  GET /ready   - Readiness (no key required)");
    info!("  GET /        - Greeting (X-api-key required)");
    info!("  GET /whoami  - Key source (X-api-key required)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("Server shutdown complete");
    Ok(())
}
