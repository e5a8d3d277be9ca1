//! `SET NX EX` lock coordinator.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use seatlock_core::lock::{LockCoordinator, LockError, ttl_seconds};
use seatlock_core::store::BoxFuture;
use std::time::Duration;

/// Value stored under every lock key. Holders are not identified.
const LOCK_VALUE: &str = "locked";

/// Redis-backed lock coordinator.
///
/// Cheap to clone; clones share one multiplexed connection through
/// `ConnectionManager`, which reconnects on failure.
#[derive(Clone)]
pub struct RedisLockCoordinator {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisLockCoordinator {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Backend`] if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self, LockError> {
        let client = Client::open(redis_url)
            .map_err(|e| LockError::Backend(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            LockError::Backend(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }
}

impl std::fmt::Debug for RedisLockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockCoordinator").finish_non_exhaustive()
    }
}

impl LockCoordinator for RedisLockCoordinator {
    fn acquire<'a>(&'a self, key: &'a str, ttl: Duration) -> BoxFuture<'a, Result<bool, LockError>> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let ttl_secs = ttl_seconds(ttl);

            // Nil reply means the key already exists.
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(LOCK_VALUE)
                .arg("NX")
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    metrics::counter!("seatlock_lock_backend_errors_total", "op" => "acquire")
                        .increment(1);
                    LockError::Backend(format!("Failed to acquire lock {key}: {e}"))
                })?;

            let acquired = reply.is_some();
            tracing::debug!(key = %key, ttl_secs, acquired, "Redis lock acquire");
            Ok(acquired)
        })
    }

    fn release<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), LockError>> {
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();

            let _: () = conn.del(key).await.map_err(|e| {
                metrics::counter!("seatlock_lock_backend_errors_total", "op" => "release")
                    .increment(1);
                LockError::Backend(format!("Failed to release lock {key}: {e}"))
            })?;

            tracing::debug!(key = %key, "Redis lock released");
            Ok(())
        })
    }
}
