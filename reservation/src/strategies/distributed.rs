//! Distributed TTL lock strategy.
//!
//! Takes a per-seat lock in the external coordinator, runs the optimistic
//! sequence, and releases the lock on every exit path. A held lock is
//! reported as [`Conflict`](ReservationError::Conflict) straight away; there
//! is no waiting, retrying or queueing.
//!
//! Release is unconditional and best effort. A failed release is logged and
//! the lock is left to expire after its TTL. Because the lock value does not
//! identify the holder, an attempt that outlives its TTL can delete a lock
//! that a later attempt now holds; the version check behind the lock still
//! keeps a second claim out.

use crate::environment::ReservationEnvironment;
use crate::error::{ConflictReason, ReservationError};
use crate::metrics::record_lock_release_failure;
use crate::strategies::optimistic::reserve_with_version_check;
use crate::strategy::{ReservationStrategy, StrategyKind, observe};
use seatlock_core::lock::LockCoordinator;
use seatlock_core::store::SeatStore;
use seatlock_core::types::{ClaimId, ClaimantId, GroupId, SeatId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a seat lock.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(10);

/// Coordinator key guarding one seat: `lock:seat:{group_id}:{seat_id}`.
#[must_use]
pub fn seat_lock_key(group_id: GroupId, seat_id: SeatId) -> String {
    format!("lock:seat:{group_id}:{seat_id}")
}

/// Reserve under a TTL lock held in an external coordinator.
///
/// `L` defaults to `dyn LockCoordinator` so the coordinator can be chosen at
/// runtime.
pub struct DistributedLockReservation<S, L: ?Sized = dyn LockCoordinator> {
    store: Arc<S>,
    coordinator: Arc<L>,
    env: ReservationEnvironment,
    lock_ttl: Duration,
}

impl<S, L: ?Sized> Clone for DistributedLockReservation<S, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coordinator: Arc::clone(&self.coordinator),
            env: self.env.clone(),
            lock_ttl: self.lock_ttl,
        }
    }
}

impl<S, L: ?Sized> fmt::Debug for DistributedLockReservation<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedLockReservation")
            .field("env", &self.env)
            .field("lock_ttl", &self.lock_ttl)
            .finish_non_exhaustive()
    }
}

impl<S, L> DistributedLockReservation<S, L>
where
    S: SeatStore,
    L: LockCoordinator + ?Sized,
{
    /// Create the strategy over a shared store and coordinator.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        coordinator: Arc<L>,
        env: ReservationEnvironment,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            store,
            coordinator,
            env,
            lock_ttl,
        }
    }

    /// How long an unreleased lock survives.
    #[must_use]
    pub const fn lock_ttl(&self) -> Duration {
        self.lock_ttl
    }

    async fn claim(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
        claimant_id: &ClaimantId,
    ) -> Result<ClaimId, ReservationError> {
        let key = seat_lock_key(group_id, seat_id);

        if !self.coordinator.acquire(&key, self.lock_ttl).await? {
            return Err(ReservationError::Conflict {
                seat_id,
                reason: ConflictReason::LockHeld,
            });
        }
        tracing::debug!(key = %key, ttl = ?self.lock_ttl, "Seat lock acquired");

        let outcome =
            reserve_with_version_check(self.store.as_ref(), &self.env, group_id, seat_id, claimant_id)
                .await;

        if let Err(error) = self.coordinator.release(&key).await {
            record_lock_release_failure();
            tracing::warn!(
                key = %key,
                %error,
                ttl = ?self.lock_ttl,
                "Failed to release seat lock, leaving it to expire"
            );
        }

        outcome
    }
}

impl<S, L> ReservationStrategy for DistributedLockReservation<S, L>
where
    S: SeatStore,
    L: LockCoordinator + ?Sized,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::Distributed
    }

    async fn reserve(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
        claimant_id: &ClaimantId,
    ) -> Result<ClaimId, ReservationError> {
        observe(
            self.kind(),
            group_id,
            seat_id,
            claimant_id,
            self.claim(group_id, seat_id, claimant_id),
        )
        .await
    }
}
