//! Reservation outcomes.
//!
//! Every failed attempt is classified as exactly one of:
//!
//! - [`ReservationError::NotFound`]: no such seat in the group
//! - [`ReservationError::AlreadyClaimed`]: the seat was claimed when read
//! - [`ReservationError::Conflict`]: another concurrent attempt interfered
//!
//! Anything else the store or lock coordinator reports is propagated
//! unmodified as [`ReservationError::Store`] or [`ReservationError::Lock`].

use seatlock_core::lock::LockError;
use seatlock_core::store::StoreError;
use seatlock_core::types::{GroupId, SeatId};
use std::fmt;
use thiserror::Error;

/// What kind of interference produced a [`ReservationError::Conflict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConflictReason {
    /// The seat's version moved on between read and write.
    VersionMismatch,
    /// The claim insert hit the one-claim-per-seat constraint.
    DuplicateClaim,
    /// Another attempt holds the seat's distributed lock.
    LockHeld,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VersionMismatch => "seat was modified concurrently",
            Self::DuplicateClaim => "seat was claimed concurrently",
            Self::LockHeld => "another reservation is in progress",
        })
    }
}

/// Errors returned by a reservation attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// No seat with this id exists in the group.
    #[error("Seat {seat_id} not found in group {group_id}")]
    NotFound {
        /// The group that was searched.
        group_id: GroupId,
        /// The seat that was requested.
        seat_id: SeatId,
    },

    /// The seat was already claimed when it was read.
    #[error("Seat {0} is already claimed")]
    AlreadyClaimed(SeatId),

    /// A concurrent attempt interfered. The caller may retry.
    #[error("Reservation conflict on seat {seat_id}: {reason}")]
    Conflict {
        /// The contended seat.
        seat_id: SeatId,
        /// What the interference was.
        reason: ConflictReason,
    },

    /// Unclassified seat store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Lock coordinator failure.
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl ReservationError {
    /// Classify a failed version-checked write or claim insert.
    ///
    /// Version conflicts and duplicate claims both mean another attempt got
    /// there first and become [`Conflict`](Self::Conflict). Everything else
    /// propagates as a store error.
    #[must_use]
    pub fn from_contended_write(seat_id: SeatId, error: StoreError) -> Self {
        match error {
            StoreError::VersionConflict { .. } => Self::Conflict {
                seat_id,
                reason: ConflictReason::VersionMismatch,
            },
            StoreError::DuplicateClaim(_) => Self::Conflict {
                seat_id,
                reason: ConflictReason::DuplicateClaim,
            },
            other => Self::Store(other),
        }
    }

    /// Whether a concurrent attempt interfered.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the seat was already claimed.
    #[must_use]
    pub const fn is_already_claimed(&self) -> bool {
        matches!(self, Self::AlreadyClaimed(_))
    }

    /// Whether the seat does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is an expected outcome of contention rather than a fault.
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::AlreadyClaimed(_) | Self::Conflict { .. })
    }

    /// Short label used for the `outcome` metric dimension.
    #[must_use]
    pub const fn outcome_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyClaimed(_) => "already_claimed",
            Self::Conflict { .. } => "conflict",
            Self::Store(_) | Self::Lock(_) => "error",
        }
    }
}
