//! The contract all three strategies share.

use crate::error::ReservationError;
use crate::metrics::record_reservation;
use seatlock_core::types::{ClaimId, ClaimantId, GroupId, SeatId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;
use tokio::time::Instant;
use tracing::Instrument;

/// Which concurrency-control strategy handles an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Exclusive row lock held for the whole attempt.
    Pessimistic,
    /// Lock-free read, version-checked write.
    Optimistic,
    /// TTL lock in an external coordinator around an optimistic attempt.
    Distributed,
}

impl StrategyKind {
    /// Every strategy, in declaration order.
    pub const ALL: [Self; 3] = [Self::Pessimistic, Self::Optimistic, Self::Distributed];

    /// Stable lowercase name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pessimistic => "pessimistic",
            Self::Optimistic => "optimistic",
            Self::Distributed => "distributed",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown strategy name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown reservation strategy: {0}")]
pub struct ParseStrategyError(String);

impl FromStr for StrategyKind {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pessimistic" => Ok(Self::Pessimistic),
            "optimistic" => Ok(Self::Optimistic),
            "redis" | "distributed" => Ok(Self::Distributed),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// One way of claiming a seat.
///
/// `reserve` returns the new claim's id, or exactly one of
/// [`NotFound`](ReservationError::NotFound),
/// [`AlreadyClaimed`](ReservationError::AlreadyClaimed) or
/// [`Conflict`](ReservationError::Conflict). Backend failures propagate as
/// [`Store`](ReservationError::Store) or [`Lock`](ReservationError::Lock).
///
/// For any number of concurrent attempts on one unclaimed seat, at most one
/// succeeds. Failed attempts leave the seat and its group untouched.
pub trait ReservationStrategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Try to claim `seat_id` in `group_id` for `claimant_id`.
    ///
    /// # Errors
    ///
    /// See the trait documentation for the failure classification.
    fn reserve(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
        claimant_id: &ClaimantId,
    ) -> impl Future<Output = Result<ClaimId, ReservationError>> + Send;
}

/// Run one attempt inside a `reserve` span and record its outcome.
pub(crate) async fn observe<F>(
    kind: StrategyKind,
    group_id: GroupId,
    seat_id: SeatId,
    claimant_id: &ClaimantId,
    attempt: F,
) -> Result<ClaimId, ReservationError>
where
    F: Future<Output = Result<ClaimId, ReservationError>> + Send,
{
    let span = tracing::info_span!(
        "reserve",
        strategy = kind.as_str(),
        group_id = %group_id,
        seat_id = %seat_id,
        claimant = %claimant_id,
    );

    let started = Instant::now();
    let result = attempt.instrument(span.clone()).await;
    record_reservation(kind, &result, started.elapsed());

    span.in_scope(|| match &result {
        Ok(claim_id) => tracing::info!(claim_id = %claim_id, "Seat claimed"),
        Err(error) if error.is_contention() => tracing::warn!(%error, "Reservation lost race"),
        Err(error) if error.is_not_found() => tracing::debug!(%error, "Reservation rejected"),
        Err(error) => tracing::error!(%error, "Reservation failed"),
    });

    result
}
