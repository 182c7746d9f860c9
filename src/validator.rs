//! API key validation with a two-slot cache and repository fallback.
//!
//! # Resolution Order
//!
//! ```text
//! presented key ──► absent? ──────────────────────────► MissingKey
//!                     │
//!                     ▼
//!            cache["api_key"]  ── hit ──┐
//!                     │ miss            │
//!                     ▼                 │
//!            cache["redisNew"] ── hit ──┤
//!                     │ miss            │
//!                     ▼                 │
//!      repository.get_by_key(presented) │
//!            │ found         │ none     │
//!            ▼               ▼          │
//!   cache["api_key"] := key  Mismatch   │
//!            │                          │
//!            └──────────► compare ◄─────┘
//!                            │
//!                 equal ─► admit   else ─► MismatchedKey
//! ```
//!
//! Any cache or repository error short-circuits to
//! [`Rejection::DataLayer`]; nothing is retried and the request fails closed.
//!
//! The legacy slot is only ever read. A key rotation job populates it and
//! clears the current slot; the next miss refills the current slot from the
//! repository.

use std::sync::Arc;
use std::time::{Duration, Instant};

use subtle::ConstantTimeEq;
use tracing::trace;

use crate::cache::KeyCache;
use crate::error::{DataLayerError, Rejection};
use crate::metrics;
use crate::models::KeySource;
use crate::repository::KeyRepository;

/// Default name of the "current" cache slot.
pub const DEFAULT_CURRENT_SLOT: &str = "api_key";

/// Default name of the "legacy" cache slot.
pub const DEFAULT_LEGACY_SLOT: &str = "redisNew";

/// Expiry of a write-through cache entry: one year, i.e. until rotated.
pub const CACHE_TTL_ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Names of the two cache slots consulted, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlots {
    pub current: String,
    pub legacy: String,
}

impl Default for CacheSlots {
    fn default() -> Self {
        Self {
            current: DEFAULT_CURRENT_SLOT.to_string(),
            legacy: DEFAULT_LEGACY_SLOT.to_string(),
        }
    }
}

/// Stateless validator over a shared cache and key repository.
///
/// Cloning is cheap; clones share the same backends.
#[derive(Clone)]
pub struct KeyValidator {
    cache: Arc<dyn KeyCache>,
    repository: Arc<dyn KeyRepository>,
    slots: CacheSlots,
    ttl: Duration,
}

impl KeyValidator {
    /// Validator with the default slot names and a one-year TTL.
    pub fn new(cache: Arc<dyn KeyCache>, repository: Arc<dyn KeyRepository>) -> Self {
        Self {
            cache,
            repository,
            slots: CacheSlots::default(),
            ttl: CACHE_TTL_ONE_YEAR,
        }
    }

    pub fn with_slots(mut self, slots: CacheSlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn slots(&self) -> &CacheSlots {
        &self.slots
    }

    /// Decide whether `presented` grants access.
    ///
    /// Returns the source of the matching canonical value on admission.
    pub async fn validate(&self, presented: Option<&str>) -> Result<KeySource, Rejection> {
        self.validate_raw(presented.map(str::as_bytes)).await
    }

    /// Like [`validate`](Self::validate) for a key taken verbatim from a
    /// header value, which need not be valid UTF-8.
    ///
    /// Only an absent or empty value is a [`Rejection::MissingKey`]. Bytes
    /// that are not UTF-8 are still compared against the cached canonical
    /// value; on a full miss they cannot name a repository record and are a
    /// [`Rejection::MismatchedKey`].
    pub async fn validate_raw(&self, presented: Option<&[u8]>) -> Result<KeySource, Rejection> {
        let started = Instant::now();
        let result = self.check(presented).await;

        let outcome = match &result {
            Ok(_) => "admitted",
            Err(rejection) => rejection.outcome(),
        };
        metrics::record_auth_decision(outcome);
        metrics::record_validation_duration(outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn check(&self, presented: Option<&[u8]>) -> Result<KeySource, Rejection> {
        let presented = match presented {
            Some(key) if !key.is_empty() => key,
            _ => return Err(Rejection::MissingKey),
        };

        let (canonical, source) = match self.read_cached().await? {
            Some(hit) => hit,
            None => {
                let Ok(presented) = std::str::from_utf8(presented) else {
                    metrics::record_repository_lookup("not_found");
                    return Err(Rejection::MismatchedKey);
                };
                match self.fetch_and_populate(presented).await? {
                    Some(key) => (key, KeySource::Repository),
                    None => return Err(Rejection::MismatchedKey),
                }
            }
        };

        if keys_match(presented, &canonical) {
            trace!(source = source.as_str(), "API key accepted");
            Ok(source)
        } else {
            Err(Rejection::MismatchedKey)
        }
    }

    /// Read the current slot, then the legacy slot. First non-empty wins.
    async fn read_cached(&self) -> Result<Option<(String, KeySource)>, DataLayerError> {
        let candidates = [
            (&self.slots.current, KeySource::CacheCurrent),
            (&self.slots.legacy, KeySource::CacheLegacy),
        ];

        for (slot, source) in candidates {
            match self.cache.get(slot).await {
                Ok(Some(value)) if !value.is_empty() => {
                    metrics::record_cache_lookup(slot, "hit");
                    return Ok(Some((value, source)));
                }
                Ok(_) => metrics::record_cache_lookup(slot, "miss"),
                Err(e) => {
                    metrics::record_cache_lookup(slot, "error");
                    return Err(e);
                }
            }
        }

        Ok(None)
    }

    /// Query the repository and write a hit through to the current slot.
    async fn fetch_and_populate(&self, presented: &str) -> Result<Option<String>, DataLayerError> {
        let record = match self.repository.get_by_key(presented).await {
            Ok(record) => record,
            Err(e) => {
                metrics::record_repository_lookup("error");
                return Err(e);
            }
        };

        let key = match record {
            Some(record) if !record.key.is_empty() => record.key,
            _ => {
                metrics::record_repository_lookup("not_found");
                return Ok(None);
            }
        };
        metrics::record_repository_lookup("found");

        self.cache.set(&self.slots.current, &key, self.ttl).await?;
        metrics::record_cache_write(&self.slots.current);

        Ok(Some(key))
    }
}

/// Exact byte equality in constant time.
fn keys_match(presented: &[u8], canonical: &str) -> bool {
    presented.ct_eq(canonical.as_bytes()).into()
}
