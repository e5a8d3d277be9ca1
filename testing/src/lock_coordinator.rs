//! In-memory lock coordinator for testing.

use seatlock_core::lock::{LockCoordinator, LockError, ttl_seconds};
use seatlock_core::store::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// In-memory [`LockCoordinator`] keyed by string.
///
/// Stores one expiry instant per key. Expired keys are treated as absent, so
/// an unreleased lock becomes acquirable exactly when its TTL elapses.
///
/// Expiry uses `tokio::time::Instant`, which means tests running with a paused
/// clock (`#[tokio::test(start_paused = true)]`) can step through a TTL with
/// `tokio::time::advance` instead of sleeping.
///
/// Release failures can be injected with [`fail_releases`](Self::fail_releases)
/// to exercise best-effort release paths.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLockCoordinator {
    locks: Arc<Mutex<HashMap<String, Instant>>>,
    fail_releases: Arc<AtomicBool>,
}

impl InMemoryLockCoordinator {
    /// Create a new coordinator with no locks held
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `release` fail (or succeed again).
    pub fn fail_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }

    /// Whether `key` is currently held and unexpired.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        let now = Instant::now();
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|expires_at| *expires_at > now)
    }
}

impl LockCoordinator for InMemoryLockCoordinator {
    fn acquire<'a>(&'a self, key: &'a str, ttl: Duration) -> BoxFuture<'a, Result<bool, LockError>> {
        Box::pin(async move {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| LockError::Backend("Mutex lock failed".into()))?;

            let now = Instant::now();
            if locks.get(key).is_some_and(|expires_at| *expires_at > now) {
                tracing::debug!(key = %key, "Mock lock already held");
                return Ok(false);
            }

            let expires_at = now + Duration::from_secs(ttl_seconds(ttl));
            locks.insert(key.to_string(), expires_at);
            tracing::debug!(key = %key, ttl_secs = ttl_seconds(ttl), "Mock lock acquired");
            Ok(true)
        })
    }

    fn release<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), LockError>> {
        Box::pin(async move {
            if self.fail_releases.load(Ordering::SeqCst) {
                return Err(LockError::Backend(format!("injected release failure for {key}")));
            }

            self.locks
                .lock()
                .map_err(|_| LockError::Backend("Mutex lock failed".into()))?
                .remove(key);
            tracing::debug!(key = %key, "Mock lock released");
            Ok(())
        })
    }
}
