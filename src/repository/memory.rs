use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;

use super::KeyRepository;
use crate::error::DataLayerError;
use crate::models::ApiKeyRecord;

/// Repository over an in-process set of canonical keys.
#[derive(Clone, Default)]
pub struct MemoryKeyRepository {
    keys: Arc<DashSet<String>>,
}

impl MemoryKeyRepository {
    /// Create a repository seeded with `keys`. Empty strings are skipped.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repo = Self::default();
        for key in keys {
            repo.insert(key);
        }
        repo
    }

    pub fn insert(&self, key: impl Into<String>) {
        let key = key.into();
        if !key.is_empty() {
            self.keys.insert(key);
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.keys.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyRepository for MemoryKeyRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<ApiKeyRecord>, DataLayerError> {
        Ok(self.keys.get(key).map(|k| ApiKeyRecord::new(k.key().clone())))
    }

    async fn ping(&self) -> Result<(), DataLayerError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_exact() {
        let repo = MemoryKeyRepository::new(["ABC123"]);

        assert_eq!(
            repo.get_by_key("ABC123").await.unwrap(),
            Some(ApiKeyRecord::new("ABC123"))
        );
        assert_eq!(repo.get_by_key("abc123").await.unwrap(), None);
        assert_eq!(repo.get_by_key("ABC12").await.unwrap(), None);
    }

    #[test]
    fn test_empty_keys_are_skipped() {
        let repo = MemoryKeyRepository::new(["", "k1", "k2", "k1"]);
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = MemoryKeyRepository::new(["k1"]);
        assert!(repo.remove("k1"));
        assert!(!repo.remove("k1"));
        assert!(repo.is_empty());
        assert_eq!(repo.get_by_key("k1").await.unwrap(), None);
    }
}
