//! Mutual-exclusion coordinator abstraction.
//!
//! A coordinator hands out TTL-bounded locks keyed by arbitrary strings,
//! backed by a shared key-value store that lives outside the seat store.
//!
//! # Semantics
//!
//! - [`LockCoordinator::acquire`] sets the key only if it is absent and
//!   returns immediately either way. Contention is reported, never waited on.
//! - [`LockCoordinator::release`] deletes the key unconditionally. It does
//!   not check that the caller is the current holder, so a caller whose lock
//!   already expired can delete a lock that someone else now holds.
//! - A holder that never releases loses the lock once the TTL elapses.
//!
//! # Implementations
//!
//! - `RedisLockCoordinator` (in `seatlock-redis`): `SET NX EX` / `DEL`
//! - `InMemoryLockCoordinator` (in `seatlock-testing`): expiry table

use crate::store::BoxFuture;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a lock coordinator backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The backing store could not be reached or rejected the command.
    #[error("Lock backend error: {0}")]
    Backend(String),
}

/// TTL-bounded, non-blocking mutual exclusion keyed by string.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the coordinator can be shared as
/// `Arc<dyn LockCoordinator>`.
pub trait LockCoordinator: Send + Sync {
    /// Try to take the lock for `key`, expiring after `ttl`.
    ///
    /// Returns `true` if the lock was taken, `false` if someone holds it.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Backend`] if the backing store fails.
    fn acquire<'a>(&'a self, key: &'a str, ttl: Duration) -> BoxFuture<'a, Result<bool, LockError>>;

    /// Delete the lock for `key`, whoever holds it.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Backend`] if the backing store fails.
    fn release<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), LockError>>;
}

/// Round a TTL up to whole seconds, with a floor of one second.
///
/// Both backends expire keys at second granularity.
#[must_use]
pub fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
