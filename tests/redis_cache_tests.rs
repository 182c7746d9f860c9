//! Redis cache backend against a real Redis started with testcontainers.
//!
//! Requires Docker. Run with: `cargo test --test redis_cache_tests -- --ignored`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

use keygate::{KeyCache, KeyValidator, MemoryKeyRepository, RedisCache};

const REDIS_PORT: u16 = 6379;

async fn start_redis() -> (ContainerAsync<GenericImage>, String) {
    let container = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(REDIS_PORT.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
        .start()
        .await
        .expect("Failed to start Redis container");

    let port = container
        .get_host_port_ipv4(REDIS_PORT)
        .await
        .expect("Failed to get Redis port");

    (container, format!("redis://127.0.0.1:{port}"))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_get_set_and_ping() {
    let (_container, url) = start_redis().await;
    let cache = RedisCache::connect(&url).unwrap();

    cache.ping().await.unwrap();
    assert_eq!(cache.get("api_key").await.unwrap(), None);

    cache
        .set("api_key", "ABC123", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(cache.get("api_key").await.unwrap().as_deref(), Some("ABC123"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_entry_expires() {
    let (_container, url) = start_redis().await;
    let cache = RedisCache::connect(&url).unwrap();

    cache
        .set("api_key", "ABC123", Duration::from_secs(1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(cache.get("api_key").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_validator_writes_through_to_redis() {
    let (_container, url) = start_redis().await;
    let cache = Arc::new(RedisCache::connect(&url).unwrap());
    let validator = KeyValidator::new(
        cache.clone(),
        Arc::new(MemoryKeyRepository::new(["ABC123"])),
    );

    assert!(validator.validate(Some("ABC123")).await.is_ok());
    assert_eq!(cache.get("api_key").await.unwrap().as_deref(), Some("ABC123"));
    assert_eq!(cache.get("redisNew").await.unwrap(), None);
}
