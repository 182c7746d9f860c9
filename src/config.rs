//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. A `.env` file is honored if present.
//!
//! # Backends
//!
//! - `REDIS_URL`: shared Redis cache. When unset, an in-process cache is used.
//! - `DATABASE_URL`: PostgreSQL key repository. When unset, the in-memory
//!   repository is seeded from `API_KEYS` (comma-separated).
//!
//! # Cache Slots
//!
//! - `CACHE_SLOT_CURRENT`: slot read first and written on a miss (default: `api_key`)
//! - `CACHE_SLOT_LEGACY`: slot read second, never written (default: `redisNew`)
//! - `CACHE_TTL_SECS`: expiry of written entries (default: one year)

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::validator::{CACHE_TTL_ONE_YEAR, CacheSlots, DEFAULT_CURRENT_SLOT, DEFAULT_LEGACY_SLOT};

/// Upper bound for `CACHE_TTL_SECS`.
///
/// Redis refuses `SET EX` when the expiry overflows its millisecond clock;
/// one hundred years stays far inside that range.
pub const MAX_CACHE_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 1MB)
    pub max_request_body_size: usize,

    // =========================================================================
    // Backend Configuration
    // =========================================================================
    /// Redis URL for the shared cache, e.g. `redis://127.0.0.1:6379`
    pub redis_url: Option<String>,

    /// PostgreSQL URL for the key repository
    pub database_url: Option<String>,

    /// Maximum pooled PostgreSQL connections (default: 5)
    pub database_max_connections: u32,

    /// Canonical keys for the in-memory repository (ignored with `DATABASE_URL`)
    pub seed_api_keys: Vec<String>,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    pub cache_slot_current: String,
    pub cache_slot_legacy: String,

    /// Expiry of write-through entries (default: one year)
    pub cache_ttl: Duration,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Paths that bypass the key check. Default: ["/health", "/ready"]
    pub auth_bypass_paths: Vec<String>,

    /// Allowed CORS origins; "*" allows any
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log filter from `RUST_LOG` (e.g., "info", "keygate=debug")
    pub log_level: String,

    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a value fails to parse or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 1024 * 1024)?,

            redis_url: Self::optional_env("REDIS_URL"),
            database_url: Self::optional_env("DATABASE_URL"),
            database_max_connections: Self::parse_env("DATABASE_MAX_CONNECTIONS", 5)?,
            seed_api_keys: parse_list(&env::var("API_KEYS").unwrap_or_default()),

            cache_slot_current: env::var("CACHE_SLOT_CURRENT")
                .unwrap_or_else(|_| DEFAULT_CURRENT_SLOT.to_string()),
            cache_slot_legacy: env::var("CACHE_SLOT_LEGACY")
                .unwrap_or_else(|_| DEFAULT_LEGACY_SLOT.to_string()),
            cache_ttl: Duration::from_secs(Self::parse_env(
                "CACHE_TTL_SECS",
                CACHE_TTL_ONE_YEAR.as_secs(),
            )?),

            auth_bypass_paths: parse_list(
                &env::var("AUTH_BYPASS_PATHS").unwrap_or_else(|_| "/health,/ready".to_string()),
            )
            .into_iter()
            .filter(|p| p.starts_with('/'))
            .collect(),
            cors_allowed_origins: parse_list(
                &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),

            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: Self::parse_env("LOG_FORMAT", LogFormat::Text)?,
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.cache_slot_current.is_empty() || self.cache_slot_legacy.is_empty() {
            return Err(AppError::ConfigError(
                "CACHE_SLOT_CURRENT and CACHE_SLOT_LEGACY must not be empty".to_string(),
            ));
        }

        if self.cache_slot_current == self.cache_slot_legacy {
            return Err(AppError::ConfigError(format!(
                "CACHE_SLOT_CURRENT and CACHE_SLOT_LEGACY must differ (both '{}')",
                self.cache_slot_current
            )));
        }

        if self.cache_ttl.is_zero() {
            return Err(AppError::ConfigError(
                "CACHE_TTL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.cache_ttl.as_secs() > MAX_CACHE_TTL_SECS {
            return Err(AppError::ConfigError(format!(
                "CACHE_TTL_SECS must be at most {MAX_CACHE_TTL_SECS} (got {})",
                self.cache_ttl.as_secs()
            )));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.database_max_connections == 0 {
            return Err(AppError::ConfigError(
                "DATABASE_MAX_CONNECTIONS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The cache slots consulted by the validator.
    pub fn cache_slots(&self) -> CacheSlots {
        CacheSlots {
            current: self.cache_slot_current.clone(),
            legacy: self.cache_slot_legacy.clone(),
        }
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_enabled()
            .then(|| SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    fn optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_request_body_size: 1024 * 1024,
            redis_url: None,
            database_url: None,
            database_max_connections: 5,
            seed_api_keys: Vec::new(),
            cache_slot_current: DEFAULT_CURRENT_SLOT.to_string(),
            cache_slot_legacy: DEFAULT_LEGACY_SLOT.to_string(),
            cache_ttl: CACHE_TTL_ONE_YEAR,
            auth_bypass_paths: vec!["/health".to_string(), "/ready".to_string()],
            cors_allowed_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_port: 9090,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.port, 3000);
        assert_eq!(config.cache_slot_current, "api_key");
        assert_eq!(config.cache_slot_legacy, "redisNew");
        assert_eq!(config.cache_ttl, Duration::from_secs(31_536_000));
        assert!(config.redis_url.is_none());
        assert!(config.database_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_addr_format() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cache_slots() {
        let slots = Config::default().cache_slots();
        assert_eq!(slots, CacheSlots::default());
    }

    #[test]
    fn test_metrics_addr() {
        assert!(Config::default().metrics_addr().is_some());

        let config = Config {
            metrics_port: 0,
            ..Config::default()
        };
        assert!(config.metrics_addr().is_none());
    }

    #[test]
    fn test_validate_identical_slots() {
        let config = Config {
            cache_slot_legacy: "api_key".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must differ"));
    }

    #[test]
    fn test_validate_empty_slot() {
        let config = Config {
            cache_slot_current: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = Config {
            cache_ttl: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("CACHE_TTL_SECS"));
    }

    #[test]
    fn test_validate_ttl_upper_bound() {
        let at_limit = Config {
            cache_ttl: Duration::from_secs(MAX_CACHE_TTL_SECS),
            ..Config::default()
        };
        assert!(at_limit.validate().is_ok());

        let too_long = Config {
            cache_ttl: Duration::from_secs(u64::MAX / 1000),
            ..Config::default()
        };
        let err = too_long.validate().unwrap_err().to_string();
        assert!(err.contains("at most"), "{err}");
    }

    #[test]
    fn test_validate_zero_pool_size() {
        let config = Config {
            database_max_connections: 0,
            ..Config::default()
        };
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("DATABASE_MAX_CONNECTIONS")
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" TEXT ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
