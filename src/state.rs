//! Shared application state for Axum handlers and the auth layer.
//!
//! Everything here is behind `Arc`; cloning per request is cheap and no
//! handler takes a lock. The cache and repository synchronize themselves.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::cache::{KeyCache, MemoryCache, RedisCache};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::repository::{KeyRepository, MemoryKeyRepository, PgKeyRepository};
use crate::validator::KeyValidator;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<dyn KeyCache>,
    pub repository: Arc<dyn KeyRepository>,
    pub validator: KeyValidator,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble state from already-built backends.
    pub fn new(
        config: Config,
        cache: Arc<dyn KeyCache>,
        repository: Arc<dyn KeyRepository>,
    ) -> Self {
        let validator = KeyValidator::new(cache.clone(), repository.clone())
            .with_slots(config.cache_slots())
            .with_ttl(config.cache_ttl);

        Self {
            config: Arc::new(config),
            cache,
            repository,
            validator,
            started_at: Instant::now(),
        }
    }

    /// Build backends from configuration and assemble state.
    ///
    /// Redis is used when `REDIS_URL` is set, PostgreSQL when `DATABASE_URL`
    /// is set; otherwise the in-process implementations are used.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConnectionFailed` if a configured backend cannot be
    /// reached at startup.
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let cache: Arc<dyn KeyCache> = match &config.redis_url {
            Some(url) => {
                let cache = RedisCache::connect(url).map_err(|source| {
                    AppError::ConnectionFailed {
                        backend: "redis",
                        source,
                    }
                })?;
                cache.ping().await.map_err(|source| AppError::ConnectionFailed {
                    backend: "redis",
                    source,
                })?;
                Arc::new(cache)
            }
            None => {
                warn!("REDIS_URL not set, using in-process cache (not shared across instances)");
                Arc::new(MemoryCache::new())
            }
        };

        let repository: Arc<dyn KeyRepository> = match &config.database_url {
            Some(url) => Arc::new(
                PgKeyRepository::connect(url, config.database_max_connections)
                    .await
                    .map_err(|source| AppError::ConnectionFailed {
                        backend: "postgres",
                        source,
                    })?,
            ),
            None => {
                if config.seed_api_keys.is_empty() {
                    warn!("Neither DATABASE_URL nor API_KEYS set, every request will be rejected");
                }
                Arc::new(MemoryKeyRepository::new(config.seed_api_keys.iter().cloned()))
            }
        };

        info!(
            cache = cache.backend_name(),
            repository = repository.backend_name(),
            "Key backends initialized"
        );

        Ok(Self::new(config, cache, repository))
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_defaults_to_memory_backends() {
        let config = Config {
            seed_api_keys: vec!["ABC123".to_string()],
            ..Config::default()
        };
        let state = AppState::from_config(config).await.unwrap();

        assert_eq!(state.cache.backend_name(), "memory");
        assert_eq!(state.repository.backend_name(), "memory");
        assert!(state.validator.validate(Some("ABC123")).await.is_ok());
    }

    #[tokio::test]
    async fn test_from_config_unreachable_redis_fails() {
        let config = Config {
            redis_url: Some("redis://127.0.0.1:1".to_string()),
            ..Config::default()
        };
        let err = AppState::from_config(config).await.err().unwrap();
        assert!(matches!(err, AppError::ConnectionFailed { backend: "redis", .. }));
    }

    #[test]
    fn test_validator_uses_configured_slots() {
        let config = Config {
            cache_slot_current: "k:current".to_string(),
            cache_slot_legacy: "k:legacy".to_string(),
            ..Config::default()
        };
        let state = AppState::new(
            config,
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryKeyRepository::default()),
        );
        assert_eq!(state.validator.slots().current, "k:current");
    }
}
