//! Optimistic version-check strategy.
//!
//! Reads the seat without locking, validates the (possibly stale) snapshot,
//! then writes it back together with the claim, in one store transaction,
//! only if its version is unchanged. A failed claim insert therefore leaves
//! the seat claimable. The pre-checks are
//! advisory; the store's version check and the one-claim-per-seat constraint
//! are what keep a second claim out. Losers that read before the winner wrote
//! fail with [`Conflict`](ReservationError::Conflict); losers that read after
//! fail with [`AlreadyClaimed`](ReservationError::AlreadyClaimed).

use crate::environment::ReservationEnvironment;
use crate::error::ReservationError;
use crate::strategy::{ReservationStrategy, StrategyKind, observe};
use seatlock_core::store::SeatStore;
use seatlock_core::types::{ClaimId, ClaimantId, GroupId, SeatId};
use std::sync::Arc;

/// Read, validate, then version-checked write and claim insert as one unit.
///
/// Shared by the optimistic and distributed-lock strategies.
pub(crate) async fn reserve_with_version_check<S: SeatStore>(
    store: &S,
    env: &ReservationEnvironment,
    group_id: GroupId,
    seat_id: SeatId,
    claimant_id: &ClaimantId,
) -> Result<ClaimId, ReservationError> {
    let seat = store
        .read_seat(group_id, seat_id)
        .await?
        .ok_or(ReservationError::NotFound { group_id, seat_id })?;

    if seat.claimed {
        return Err(ReservationError::AlreadyClaimed(seat_id));
    }

    env.process().await;

    let (saved, claim) = store
        .claim_seat_with_version_check(&seat.mark_claimed(), claimant_id, env.now())
        .await
        .map_err(|e| ReservationError::from_contended_write(seat_id, e))?;

    tracing::debug!(claim_id = %claim.id, version = saved.version, "Claim written after version check");
    Ok(claim.id)
}

/// Reserve with a lock-free read and a version-checked write.
#[derive(Debug)]
pub struct OptimisticReservation<S> {
    store: Arc<S>,
    env: ReservationEnvironment,
}

impl<S> Clone for OptimisticReservation<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            env: self.env.clone(),
        }
    }
}

impl<S: SeatStore> OptimisticReservation<S> {
    /// Create the strategy over a shared store.
    #[must_use]
    pub const fn new(store: Arc<S>, env: ReservationEnvironment) -> Self {
        Self { store, env }
    }
}

impl<S: SeatStore> ReservationStrategy for OptimisticReservation<S> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Optimistic
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
            reserve_with_version_check(self.store.as_ref(), &self.env, group_id, seat_id, claimant_id),
        )
        .await
    }
}
