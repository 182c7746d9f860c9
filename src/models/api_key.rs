//! Canonical API key record and the provenance of a resolved key.

use serde::Serialize;

/// Canonical key record as stored by the key repository.
///
/// # Database Table
///
/// Maps to the `key` column of the `api_keys` table. Only the canonical
/// secret is read; any other columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApiKeyRecord {
    /// The authoritative secret value
    pub key: String,
}

impl ApiKeyRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Where the canonical value that admitted a request came from.
///
/// Inserted into request extensions on admission so that handlers can
/// extract it with `Extension<KeySource>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// The "current" cache slot
    CacheCurrent,
    /// The "legacy" cache slot left behind by a key rotation
    CacheLegacy,
    /// A fresh repository lookup after a miss in both slots
    Repository,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::CacheCurrent => "cache_current",
            KeySource::CacheLegacy => "cache_legacy",
            KeySource::Repository => "repository",
        }
    }
}
