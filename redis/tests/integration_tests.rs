//! Integration tests for `RedisLockCoordinator` using testcontainers.
//!
//! # Requirements
//!
//! Docker must be running to execute these tests. The tests will automatically start a
//! Redis container using testcontainers.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

use std::sync::Arc;
use std::time::Duration;

use seatlock_core::lock::LockCoordinator;
use seatlock_redis::RedisLockCoordinator;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;

/// Helper to start a Redis container and return a connected coordinator.
///
/// Returns both the container (to keep it alive) and the coordinator.
///
/// # Panics
/// Panics if container setup fails (test environment issue).
async fn setup_redis_coordinator() -> (ContainerAsync<Redis>, RedisLockCoordinator) {
    let container = Redis::default()
        .start()
        .await
        .expect("Failed to start redis container");

    let port = container
        .get_host_port_ipv4(6379)
        .await
        .expect("Failed to get redis port");

    let redis_url = format!("redis://127.0.0.1:{port}");

    let mut retries = 0;
    let max_retries = 30;
    loop {
        if let Ok(coordinator) = RedisLockCoordinator::new(&redis_url).await {
            return (container, coordinator);
        }

        assert!(retries < max_retries, "Failed to connect after {max_retries} retries");
        retries += 1;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[tokio::test]
async fn test_acquire_is_exclusive_until_release() {
    let (_container, coordinator) = setup_redis_coordinator().await;
    let ttl = Duration::from_secs(10);

    assert!(coordinator.acquire("lock:seat:1:1", ttl).await.expect("acquire"));
    assert!(!coordinator.acquire("lock:seat:1:1", ttl).await.expect("acquire"));

    coordinator.release("lock:seat:1:1").await.expect("release");
    assert!(coordinator.acquire("lock:seat:1:1", ttl).await.expect("acquire"));
}

#[tokio::test]
async fn test_release_of_absent_key_succeeds() {
    let (_container, coordinator) = setup_redis_coordinator().await;

    coordinator.release("lock:seat:9:9").await.expect("release");
}

#[tokio::test]
async fn test_unreleased_lock_expires() {
    let (_container, coordinator) = setup_redis_coordinator().await;
    let ttl = Duration::from_secs(1);

    assert!(coordinator.acquire("lock:seat:1:2", ttl).await.expect("acquire"));
    assert!(!coordinator.acquire("lock:seat:1:2", ttl).await.expect("acquire"));

    // Real time: the key lives in the container, not under tokio's clock.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(coordinator.acquire("lock:seat:1:2", ttl).await.expect("acquire"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquire_has_one_winner() {
    let (_container, coordinator) = setup_redis_coordinator().await;
    let coordinator: Arc<dyn LockCoordinator> = Arc::new(coordinator);

    let attempts = (0..50).map(|_| {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .acquire("lock:seat:1:3", Duration::from_secs(10))
                .await
                .expect("acquire")
        })
    });

    let acquired = futures::future::join_all(attempts)
        .await
        .into_iter()
        .filter(|joined| *joined.as_ref().expect("task"))
        .count();

    assert_eq!(acquired, 1);
}
