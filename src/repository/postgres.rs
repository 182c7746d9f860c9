use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::debug;

use super::KeyRepository;
use crate::error::DataLayerError;
use crate::models::ApiKeyRecord;

/// SQLSTATE codes classified as the store rejecting the presented value
/// (`22P02` is invalid_text_representation).
const INVALID_VALUE_CODES: [&str; 2] = ["22P02", "23956"];

/// How long to wait for a pooled connection before reporting unavailability.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository over the `api_keys` table.
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE api_keys (key TEXT PRIMARY KEY);
/// ```
#[derive(Clone)]
pub struct PgKeyRepository {
    pool: Pool<Postgres>,
}

impl PgKeyRepository {
    /// Connect to PostgreSQL and build a pool of at most `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DataLayerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(Self { pool })
    }

    /// Wrap a pool the caller already configured and connected.
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Map a `sqlx` error onto the data-layer classification.
pub fn classify_sqlx_error(err: sqlx::Error) -> DataLayerError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(code) if INVALID_VALUE_CODES.contains(&code) => {
                DataLayerError::InvalidValue(err.to_string())
            }
            _ => DataLayerError::Backend(err.to_string()),
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => DataLayerError::Unavailable(err.to_string()),
        _ => DataLayerError::Backend(err.to_string()),
    }
}

#[async_trait]
impl KeyRepository for PgKeyRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiKeyRecord>, DataLayerError> {
        let record = sqlx::query_as::<_, ApiKeyRecord>(
            "SELECT key FROM api_keys WHERE key = $1 LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        debug!(found = record.is_some(), "api_keys lookup");
        Ok(record)
    }

    async fn ping(&self) -> Result<(), DataLayerError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(classify_sqlx_error)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
