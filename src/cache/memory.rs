use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::KeyCache;
use crate::error::DataLayerError;

#[derive(Clone, Debug)]
struct CachedEntry {
    value: String,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// In-process cache backed by a concurrent map.
///
/// Cloning is cheap and clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a slot. Stands in for an external rotation job clearing it.
    pub fn remove(&self, slot: &str) {
        self.entries.remove(slot);
    }
}

#[async_trait]
impl KeyCache for MemoryCache {
    async fn get(&self, slot: &str) -> Result<Option<String>, DataLayerError> {
        if let Some(entry) = self.entries.get(slot) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Re-checked under the shard lock so a concurrent fresh `set` survives
        if self
            .entries
            .remove_if(slot, |_, entry| entry.is_expired())
            .is_some()
        {
            trace!(slot, "evicted expired cache entry");
        }
        Ok(None)
    }

    async fn set(&self, slot: &str, value: &str, ttl: Duration) -> Result<(), DataLayerError> {
        self.entries
            .insert(slot.to_string(), CachedEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn ping(&self) -> Result<(), DataLayerError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
