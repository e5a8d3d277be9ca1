//! Exclusive row lock strategy.
//!
//! The whole attempt runs inside one store transaction that holds the seat's
//! row lock. Concurrent attempts queue on the lock and each sees the seat as
//! the previous holder left it, so every loser fails with
//! [`AlreadyClaimed`](ReservationError::AlreadyClaimed), never with a conflict.

use crate::environment::ReservationEnvironment;
use crate::error::ReservationError;
use crate::strategy::{ReservationStrategy, StrategyKind, observe};
use seatlock_core::store::{LockedSeat, SeatStore, with_exclusive_lock};
use seatlock_core::types::{ClaimId, ClaimantId, GroupId, SeatId};
use std::sync::Arc;

/// Reserve under an exclusive row lock.
#[derive(Debug)]
pub struct PessimisticReservation<S> {
    store: Arc<S>,
    env: ReservationEnvironment,
}

impl<S> Clone for PessimisticReservation<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            env: self.env.clone(),
        }
    }
}

impl<S: SeatStore> PessimisticReservation<S> {
    /// Create the strategy over a shared store.
    #[must_use]
    pub const fn new(store: Arc<S>, env: ReservationEnvironment) -> Self {
        Self { store, env }
    }

    async fn claim(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
        claimant_id: &ClaimantId,
    ) -> Result<ClaimId, ReservationError> {
        let env = self.env.clone();
        let claimant_id = claimant_id.clone();

        // Waits here, without timeout, while another attempt holds the row.
        with_exclusive_lock(self.store.as_ref(), group_id, seat_id, move |locked| {
            Box::pin(async move {
                let seat = locked
                    .seat()
                    .cloned()
                    .ok_or(ReservationError::NotFound { group_id, seat_id })?;

                if seat.claimed {
                    return Err(ReservationError::AlreadyClaimed(seat_id));
                }

                env.process().await;

                let saved = locked.save_seat(&seat.mark_claimed()).await?;
                let claim = locked.create_claim(&saved, &claimant_id, env.now()).await?;

                tracing::debug!(claim_id = %claim.id, version = saved.version, "Claim written under row lock");
                Ok(claim.id)
            })
        })
        .await
    }
}

impl<S: SeatStore> ReservationStrategy for PessimisticReservation<S> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pessimistic
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
