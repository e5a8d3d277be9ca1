//! Domain types for seat reservation.
//!
//! Records are plain data linked by id. A [`Claim`] references exactly one
//! [`Seat`] through `seat_id`; the one-to-one relation is enforced by the
//! store (unique key on the seat reference), not by object links.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a group of seats (an event).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(i64);

impl GroupId {
    /// Create a `GroupId` from its raw database key
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw database key
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a seat
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatId(i64);

impl SeatId {
    /// Create a `SeatId` from its raw database key
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw database key
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a claim (a successful reservation)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimId(i64);

impl ClaimId {
    /// Create a `ClaimId` from its raw database key
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw database key
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of whoever is trying to claim a seat.
///
/// Opaque to the core: it is stored on the claim and never interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimantId(String);

impl ClaimantId {
    /// Create a new `ClaimantId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClaimantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClaimantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A group of seats, e.g. a concert. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier
    pub id: GroupId,
    /// Display name
    pub name: String,
    /// Date the group takes place
    pub date: NaiveDate,
    /// Number of seats the group was created with
    pub total_seats: i32,
}

/// A single claimable seat.
///
/// `claimed` moves from `false` to `true` exactly once. `version` is bumped by
/// the store on every write and is what optimistic writers compare against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Seat identifier
    pub id: SeatId,
    /// Owning group
    pub group_id: GroupId,
    /// Human-facing seat number
    pub seat_number: i32,
    /// Whether a claim has been made
    pub claimed: bool,
    /// Write counter used for optimistic concurrency
    pub version: i64,
}

impl Seat {
    /// Return a copy of this seat with `claimed` set.
    ///
    /// The version is left untouched; the store increments it on write.
    #[must_use]
    pub fn mark_claimed(&self) -> Self {
        Self {
            claimed: true,
            ..self.clone()
        }
    }
}

/// A successful reservation of one seat by one claimant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim identifier
    pub id: ClaimId,
    /// The claimed seat (unique across all claims)
    pub seat_id: SeatId,
    /// Who claimed it
    pub claimant_id: ClaimantId,
    /// When the claim was written
    pub claimed_at: DateTime<Utc>,
}

/// Input for creating a [`Group`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewGroup {
    /// Display name
    pub name: String,
    /// Date the group takes place
    pub date: NaiveDate,
    /// Total number of seats
    pub total_seats: i32,
}

/// Input for creating a [`Seat`]. New seats start unclaimed at version 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewSeat {
    /// Owning group
    pub group_id: GroupId,
    /// Human-facing seat number
    pub seat_number: i32,
}

/// Version every newly created seat starts at.
pub const INITIAL_SEAT_VERSION: i64 = 1;
