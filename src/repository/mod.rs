//! Key repository: authoritative lookup of canonical API key records.
//!
//! - [`MemoryKeyRepository`]: a seeded in-process set, for single-node
//!   deployments and tests
//! - [`PgKeyRepository`]: the `api_keys` table in PostgreSQL via `sqlx`

use async_trait::async_trait;

use crate::error::DataLayerError;
use crate::models::ApiKeyRecord;

mod memory;
mod postgres;

pub use memory::MemoryKeyRepository;
pub use postgres::{PgKeyRepository, classify_sqlx_error};

/// Lookup of canonical key records by presented key.
#[async_trait]
pub trait KeyRepository: Send + Sync {
    /// Find the record whose canonical value matches `key`.
    ///
    /// `Ok(None)` means "not found" and is not an error.
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiKeyRecord>, DataLayerError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), DataLayerError>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}
