//! Seat store trait and related types.
//!
//! The store is the single source of truth for groups, seats and claims. It
//! offers the two synchronization primitives the reservation strategies are
//! built on:
//!
//! - **Exclusive row lock**: [`SeatStore::lock_seat`] opens a transaction and
//!   reads the seat while holding a write lock on its row. The returned
//!   [`LockedSeat`] guard owns the transaction; [`LockedSeat::commit`] makes
//!   its writes durable, and rolling back or dropping the guard discards them.
//!   Either way the row lock is released. A concurrent `lock_seat` for the same
//!   seat waits until then.
//! - **Version check**: [`SeatStore::save_seat_with_version_check`] writes a
//!   seat only if the stored version still equals the caller's, and bumps it.
//!   [`SeatStore::claim_seat_with_version_check`] does the same and inserts
//!   the claim in the same transaction.
//!
//! Independently of both, [`SeatStore::create_claim`] rejects a second claim for
//! the same seat. That uniqueness check is the last line of defence against
//! duplicate claims.
//!
//! # Implementations
//!
//! - `PostgresSeatStore` (in `seatlock-postgres`): `SELECT ... FOR UPDATE`
//! - `InMemorySeatStore` (in `seatlock-testing`): per-seat async mutex

use crate::types::{Claim, ClaimantId, Group, GroupId, NewGroup, NewSeat, Seat, SeatId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed, sendable future borrowed for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur during seat store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: the seat was written since it was read.
    #[error("Version conflict on seat {seat_id}: expected version {expected}, found {actual}")]
    VersionConflict {
        /// The seat that was written concurrently.
        seat_id: SeatId,
        /// The version the caller read.
        expected: i64,
        /// The version currently stored.
        actual: i64,
    },

    /// A claim already references this seat.
    #[error("Seat {0} already has a claim")]
    DuplicateClaim(SeatId),

    /// The seat does not exist.
    #[error("Seat not found: {0}")]
    SeatNotFound(SeatId),

    /// The group does not exist.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// A seat row held under an exclusive lock for the lifetime of a transaction.
///
/// Writes made through the guard become visible to other callers only after
/// [`commit`](LockedSeat::commit). Dropping the guard without committing rolls
/// the transaction back.
pub trait LockedSeat: Send {
    /// The locked seat, or `None` if no seat matched the lookup.
    fn seat(&self) -> Option<&Seat>;

    /// Write the seat inside the transaction.
    ///
    /// The stored version is incremented; the returned seat carries the new
    /// version.
    ///
    /// # Errors
    ///
    /// - `SeatNotFound`: nothing is locked
    /// - `DatabaseError`: the write failed
    fn save_seat(&mut self, seat: &Seat) -> impl Future<Output = Result<Seat, StoreError>> + Send;

    /// Insert a claim for `seat` inside the transaction.
    ///
    /// # Errors
    ///
    /// - `DuplicateClaim`: the seat already has a claim
    /// - `DatabaseError`: the insert failed
    fn create_claim(
        &mut self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Claim, StoreError>> + Send;

    /// Commit the transaction and release the row lock.
    ///
    /// # Errors
    ///
    /// - `DuplicateClaim`: a claim for the seat appeared before commit
    /// - `DatabaseError`: the commit failed
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Roll the transaction back and release the row lock.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the rollback could not be sent. The lock is
    /// still released when the underlying connection is closed.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Durable storage for groups, seats and claims.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// concurrent reservation attempt.
pub trait SeatStore: Send + Sync {
    /// Transaction guard returned by [`lock_seat`](SeatStore::lock_seat).
    type Locked: LockedSeat;

    /// Open a transaction and lock the seat's row.
    ///
    /// The seat is looked up by `seat_id` within `group_id`. If it does not
    /// exist the guard is still returned, with [`LockedSeat::seat`] yielding
    /// `None`. Waits, without timeout, while another transaction holds the row.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the transaction or lock query fails.
    fn lock_seat(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
    ) -> impl Future<Output = Result<Self::Locked, StoreError>> + Send;

    /// Lock-free read of the current seat state, version included.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    fn read_seat(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
    ) -> impl Future<Output = Result<Option<Seat>, StoreError>> + Send;

    /// Write `seat` only if the stored version equals `seat.version`.
    ///
    /// On success the stored version is incremented atomically and the written
    /// seat is returned with its new version.
    ///
    /// # Errors
    ///
    /// - `VersionConflict`: the stored version no longer matches
    /// - `SeatNotFound`: the seat does not exist
    /// - `DatabaseError`: the update failed
    fn save_seat_with_version_check(
        &self,
        seat: &Seat,
    ) -> impl Future<Output = Result<Seat, StoreError>> + Send;

    /// Insert a claim for `seat`.
    ///
    /// # Errors
    ///
    /// - `DuplicateClaim`: a claim already references the seat
    /// - `SeatNotFound`: the seat does not exist
    /// - `DatabaseError`: the insert failed
    fn create_claim(
        &self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Claim, StoreError>> + Send;

    /// Version-checked write of `seat` and insert of its claim, as one unit.
    ///
    /// Both take effect or neither does. If the claim insert fails, the seat
    /// keeps its previous state and version.
    ///
    /// # Errors
    ///
    /// - `VersionConflict`: the stored version no longer matches
    /// - `DuplicateClaim`: a claim already references the seat
    /// - `SeatNotFound`: the seat does not exist
    /// - `DatabaseError`: the update, insert or commit failed
    fn claim_seat_with_version_check(
        &self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(Seat, Claim), StoreError>> + Send;

    /// Create a group.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    fn create_group(
        &self,
        group: NewGroup,
    ) -> impl Future<Output = Result<Group, StoreError>> + Send;

    /// Create an unclaimed seat at the initial version.
    ///
    /// # Errors
    ///
    /// - `GroupNotFound`: the owning group does not exist
    /// - `DatabaseError`: the insert failed
    fn create_seat(&self, seat: NewSeat) -> impl Future<Output = Result<Seat, StoreError>> + Send;

    /// Look up a group.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    fn find_group(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Option<Group>, StoreError>> + Send;

    /// Look up the claim for a seat, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    fn find_claim_by_seat(
        &self,
        seat_id: SeatId,
    ) -> impl Future<Output = Result<Option<Claim>, StoreError>> + Send;

    /// Count the claims referencing a seat. Never more than one.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    fn count_claims_for_seat(
        &self,
        seat_id: SeatId,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Run `f` while holding the exclusive lock on a seat's row.
///
/// Commits when `f` returns `Ok` and rolls back when it returns `Err`. The row
/// lock is released on both paths. A rollback failure is logged and the
/// original error returned.
///
/// # Errors
///
/// Returns the error produced by `f`, or the store error from opening or
/// committing the transaction.
///
/// # Example
///
/// ```ignore
/// let claimed = with_exclusive_lock(&store, group_id, seat_id, |locked| {
///     Box::pin(async move {
///         let seat = locked.seat().cloned().ok_or(StoreError::SeatNotFound(seat_id))?;
///         locked.save_seat(&seat.mark_claimed()).await
///     })
/// })
/// .await?;
/// ```
pub async fn with_exclusive_lock<S, T, E, F>(
    store: &S,
    group_id: GroupId,
    seat_id: SeatId,
    f: F,
) -> Result<T, E>
where
    S: SeatStore,
    E: From<StoreError>,
    F: for<'t> FnOnce(&'t mut S::Locked) -> BoxFuture<'t, Result<T, E>>,
{
    let mut locked = store.lock_seat(group_id, seat_id).await?;

    match f(&mut locked).await {
        Ok(value) => {
            locked.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = locked.rollback().await {
                tracing::warn!(
                    seat_id = %seat_id,
                    error = %rollback_error,
                    "Rollback failed after aborted seat transaction"
                );
            }
            Err(error)
        }
    }
}
