use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands, RedisError};
use deadpool_redis::{Config as RedisPoolConfig, Connection, Pool, Runtime};
use tracing::debug;

use super::KeyCache;
use crate::error::DataLayerError;

/// Cache backed by a shared Redis instance.
///
/// Slots are plain Redis string keys; writes use `SET key value EX ttl`.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    /// Build a connection pool for `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// Connections are opened lazily, so this only fails on a malformed URL.
    /// Call [`KeyCache::ping`] to verify the server is reachable.
    pub fn connect(url: &str) -> Result<Self, DataLayerError> {
        let pool = RedisPoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DataLayerError::Unavailable(format!("invalid Redis pool config: {e}")))?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<Connection, DataLayerError> {
        self.pool
            .get()
            .await
            .map_err(|e| DataLayerError::Unavailable(format!("Redis pool: {e}")))
    }
}

/// Map a Redis driver error onto the data-layer classification.
fn classify_redis_error(err: RedisError) -> DataLayerError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        DataLayerError::Unavailable(err.to_string())
    } else {
        DataLayerError::Backend(err.to_string())
    }
}

#[async_trait]
impl KeyCache for RedisCache {
    async fn get(&self, slot: &str) -> Result<Option<String>, DataLayerError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(slot).await.map_err(classify_redis_error)?;
        debug!(slot, hit = value.is_some(), "Redis GET");
        Ok(value)
    }

    async fn set(&self, slot: &str, value: &str, ttl: Duration) -> Result<(), DataLayerError> {
        let mut conn = self.connection().await?;
        // Redis rejects EX 0
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(slot, value, ttl_secs)
            .await
            .map_err(classify_redis_error)?;
        debug!(slot, ttl_secs, "Redis SET EX");
        Ok(())
    }

    async fn ping(&self) -> Result<(), DataLayerError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(classify_redis_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use deadpool_redis::redis::ErrorKind;

    #[test]
    fn test_connect_rejects_malformed_url() {
        assert!(matches!(
            RedisCache::connect("not a url"),
            Err(DataLayerError::Unavailable(_))
        ));
    }

    #[test]
    fn test_connect_is_lazy() {
        // Nothing listens here; pool creation must still succeed
        assert!(RedisCache::connect("redis://127.0.0.1:1").is_ok());
    }

    #[test]
    fn test_classify_io_error_as_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            classify_redis_error(RedisError::from(io)),
            DataLayerError::Unavailable(_)
        ));
    }

    #[test]
    fn test_classify_type_error_as_backend() {
        let err = RedisError::from((ErrorKind::TypeError, "wrong type"));
        assert!(matches!(
            classify_redis_error(err),
            DataLayerError::Backend(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let cache = RedisCache::connect("redis://127.0.0.1:1").unwrap();
        assert!(matches!(
            cache.get("api_key").await,
            Err(DataLayerError::Unavailable(_))
        ));
    }
}
