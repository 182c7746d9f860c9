//! Cache store holding canonical API key values under named slots.
//!
//! Two backends implement [`KeyCache`]:
//!
//! - [`MemoryCache`]: process-local `DashMap` with per-entry expiry, used for
//!   single-instance deployments and tests
//! - [`RedisCache`]: shared Redis instance via a `deadpool-redis` pool, so all
//!   replicas see the same slots and an external rotation job can overwrite
//!   them
//!
//! Backends synchronize themselves; callers hold them behind `Arc<dyn KeyCache>`
//! and never lock.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DataLayerError;

mod memory;
mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// String-keyed cache with expiry.
#[async_trait]
pub trait KeyCache: Send + Sync {
    /// Read a slot. Missing and expired slots both yield `Ok(None)`.
    async fn get(&self, slot: &str) -> Result<Option<String>, DataLayerError>;

    /// Write a slot, replacing any previous value (last write wins).
    async fn set(&self, slot: &str, value: &str, ttl: Duration) -> Result<(), DataLayerError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), DataLayerError>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}
