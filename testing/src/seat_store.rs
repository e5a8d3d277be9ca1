//! In-memory seat store for fast, deterministic tests.
//!
//! Mirrors the locking behaviour of the Postgres store closely enough for the
//! reservation strategies to be exercised under real contention:
//!
//! - Each seat row has its own `tokio::sync::Mutex`. [`SeatStore::lock_seat`]
//!   holds it for the life of the returned guard, the way `SELECT ... FOR
//!   UPDATE` holds a row lock until commit. Waiters are woken in FIFO order.
//! - Guard writes are buffered and applied on commit; dropping the guard
//!   discards them.
//! - Version-checked saves briefly take the same row mutex, like an `UPDATE`
//!   waiting on a locked row.
//! - Claim uniqueness per seat is checked on insert and again on commit.
//! - Row mutexes exist only for seats that exist; lookups of unknown ids
//!   leave nothing behind.
//! - Write failures can be injected with [`InMemorySeatStore::fail_writes`],
//!   and claim-insert failures alone with [`InMemorySeatStore::fail_claims`].

use chrono::{DateTime, Utc};
use seatlock_core::store::{LockedSeat, SeatStore, StoreError};
use seatlock_core::types::{
    Claim, ClaimId, ClaimantId, Group, GroupId, INITIAL_SEAT_VERSION, NewGroup, NewSeat, Seat,
    SeatId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Default)]
struct Tables {
    groups: BTreeMap<GroupId, Group>,
    seats: BTreeMap<SeatId, Seat>,
    claims: BTreeMap<ClaimId, Claim>,
    claim_by_seat: HashMap<SeatId, ClaimId>,
    last_group_id: i64,
    last_seat_id: i64,
    last_claim_id: i64,
}

impl Tables {
    fn next_group_id(&mut self) -> GroupId {
        self.last_group_id += 1;
        GroupId::new(self.last_group_id)
    }

    fn next_seat_id(&mut self) -> SeatId {
        self.last_seat_id += 1;
        SeatId::new(self.last_seat_id)
    }

    fn next_claim_id(&mut self) -> ClaimId {
        self.last_claim_id += 1;
        ClaimId::new(self.last_claim_id)
    }

    fn seat_in_group(&self, group_id: GroupId, seat_id: SeatId) -> Option<Seat> {
        self.seats
            .get(&seat_id)
            .filter(|seat| seat.group_id == group_id)
            .cloned()
    }

    fn insert_claim(&mut self, claim: Claim) -> Result<(), StoreError> {
        if self.claim_by_seat.contains_key(&claim.seat_id) {
            return Err(StoreError::DuplicateClaim(claim.seat_id));
        }
        self.claim_by_seat.insert(claim.seat_id, claim.id);
        self.claims.insert(claim.id, claim);
        Ok(())
    }
}

type RowLock = Arc<tokio::sync::Mutex<()>>;

fn injected_failure(fail_writes: &AtomicBool, op: &str) -> Result<(), StoreError> {
    if fail_writes.load(Ordering::SeqCst) {
        return Err(StoreError::DatabaseError(format!("injected failure in {op}")));
    }
    Ok(())
}

/// In-memory [`SeatStore`] for tests.
///
/// Cloning is cheap and clones share the same tables.
///
/// # Example
///
/// ```
/// use seatlock_testing::InMemorySeatStore;
/// use seatlock_core::{NewGroup, NewSeat, SeatStore};
/// use chrono::NaiveDate;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemorySeatStore::new();
/// let group = store
///     .create_group(NewGroup {
///         name: "Concert".to_string(),
///         date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default(),
///         total_seats: 100,
///     })
///     .await?;
/// let seat = store
///     .create_seat(NewSeat { group_id: group.id, seat_number: 1 })
///     .await?;
///
/// assert!(!seat.claimed);
/// assert_eq!(store.claim_count(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySeatStore {
    tables: Arc<Mutex<Tables>>,
    row_locks: Arc<Mutex<HashMap<SeatId, RowLock>>>,
    fail_writes: Arc<AtomicBool>,
    fail_claims: Arc<AtomicBool>,
}

impl InMemorySeatStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent seat or claim write fail with
    /// [`StoreError::DatabaseError`] (or succeed again).
    ///
    /// Applies to version-checked saves, claim inserts and writes through a
    /// locked guard. Setup operations are unaffected.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only claim inserts fail with [`StoreError::DatabaseError`].
    ///
    /// Seat writes still go through, so a caller that writes the seat before
    /// inserting the claim sees the second half fail.
    pub fn fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::DatabaseError("Mutex lock failed".into()))
    }

    /// Row mutex for `seat_id`, or `None` if the seat does not exist.
    fn row_lock(&self, seat_id: SeatId) -> Result<Option<RowLock>, StoreError> {
        if !self.tables()?.seats.contains_key(&seat_id) {
            return Ok(None);
        }

        let mut row_locks = self
            .row_locks
            .lock()
            .map_err(|_| StoreError::DatabaseError("Mutex lock failed".into()))?;
        Ok(Some(Arc::clone(row_locks.entry(seat_id).or_default())))
    }

    fn snapshot(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of a seat, regardless of group.
    ///
    /// Useful for assertions in tests.
    #[must_use]
    pub fn seat(&self, seat_id: SeatId) -> Option<Seat> {
        self.snapshot().seats.get(&seat_id).cloned()
    }

    /// All committed claims, ordered by id.
    #[must_use]
    pub fn claims(&self) -> Vec<Claim> {
        self.snapshot().claims.values().cloned().collect()
    }

    /// Total number of committed claims across all seats.
    #[must_use]
    pub fn claim_count(&self) -> usize {
        self.snapshot().claims.len()
    }
}

/// Transaction guard for [`InMemorySeatStore`].
///
/// Holds the seat's row mutex until committed, rolled back or dropped.
#[derive(Debug)]
pub struct InMemoryLockedSeat {
    tables: Arc<Mutex<Tables>>,
    seat: Option<Seat>,
    pending_seat: Option<Seat>,
    pending_claim: Option<Claim>,
    fail_writes: Arc<AtomicBool>,
    fail_claims: Arc<AtomicBool>,
    _row: Option<OwnedMutexGuard<()>>,
}

impl InMemoryLockedSeat {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::DatabaseError("Mutex lock failed".into()))
    }
}

impl LockedSeat for InMemoryLockedSeat {
    fn seat(&self) -> Option<&Seat> {
        self.seat.as_ref()
    }

    async fn save_seat(&mut self, seat: &Seat) -> Result<Seat, StoreError> {
        injected_failure(&self.fail_writes, "save_seat")?;
        let current = self.seat.as_ref().ok_or(StoreError::SeatNotFound(seat.id))?;
        if current.id != seat.id {
            return Err(StoreError::SeatNotFound(seat.id));
        }

        let written = Seat {
            version: current.version + 1,
            ..seat.clone()
        };
        self.seat = Some(written.clone());
        self.pending_seat = Some(written.clone());
        Ok(written)
    }

    async fn create_claim(
        &mut self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<Claim, StoreError> {
        injected_failure(&self.fail_writes, "create_claim")?;
        injected_failure(&self.fail_claims, "create_claim")?;
        if self.pending_claim.is_some() {
            return Err(StoreError::DuplicateClaim(seat.id));
        }

        let id = {
            let mut tables = self.tables()?;
            if tables.claim_by_seat.contains_key(&seat.id) {
                return Err(StoreError::DuplicateClaim(seat.id));
            }
            tables.next_claim_id()
        };

        let claim = Claim {
            id,
            seat_id: seat.id,
            claimant_id: claimant_id.clone(),
            claimed_at,
        };
        self.pending_claim = Some(claim.clone());
        Ok(claim)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut tables = self.tables()?;

        if let Some(claim) = &self.pending_claim {
            if tables.claim_by_seat.contains_key(&claim.seat_id) {
                return Err(StoreError::DuplicateClaim(claim.seat_id));
            }
        }
        if let Some(seat) = self.pending_seat.clone() {
            tables.seats.insert(seat.id, seat);
        }
        if let Some(claim) = self.pending_claim.clone() {
            tables.insert_claim(claim)?;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl SeatStore for InMemorySeatStore {
    type Locked = InMemoryLockedSeat;

    async fn lock_seat(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
    ) -> Result<InMemoryLockedSeat, StoreError> {
        let row = match self.row_lock(seat_id)? {
            Some(lock) => Some(lock.lock_owned().await),
            None => None,
        };
        let seat = self.tables()?.seat_in_group(group_id, seat_id);

        Ok(InMemoryLockedSeat {
            tables: Arc::clone(&self.tables),
            seat,
            pending_seat: None,
            pending_claim: None,
            fail_writes: Arc::clone(&self.fail_writes),
            fail_claims: Arc::clone(&self.fail_claims),
            _row: row,
        })
    }

    async fn read_seat(&self, group_id: GroupId, seat_id: SeatId) -> Result<Option<Seat>, StoreError> {
        Ok(self.tables()?.seat_in_group(group_id, seat_id))
    }

    async fn save_seat_with_version_check(&self, seat: &Seat) -> Result<Seat, StoreError> {
        injected_failure(&self.fail_writes, "save_seat_with_version_check")?;
        let _row = self
            .row_lock(seat.id)?
            .ok_or(StoreError::SeatNotFound(seat.id))?
            .lock_owned()
            .await;
        let mut tables = self.tables()?;

        let stored = tables
            .seats
            .get_mut(&seat.id)
            .ok_or(StoreError::SeatNotFound(seat.id))?;
        if stored.version != seat.version {
            return Err(StoreError::VersionConflict {
                seat_id: seat.id,
                expected: seat.version,
                actual: stored.version,
            });
        }

        stored.claimed = seat.claimed;
        stored.seat_number = seat.seat_number;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn create_claim(
        &self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<Claim, StoreError> {
        injected_failure(&self.fail_writes, "create_claim")?;
        injected_failure(&self.fail_claims, "create_claim")?;
        let mut tables = self.tables()?;
        if !tables.seats.contains_key(&seat.id) {
            return Err(StoreError::SeatNotFound(seat.id));
        }
        if tables.claim_by_seat.contains_key(&seat.id) {
            return Err(StoreError::DuplicateClaim(seat.id));
        }

        let claim = Claim {
            id: tables.next_claim_id(),
            seat_id: seat.id,
            claimant_id: claimant_id.clone(),
            claimed_at,
        };
        tables.insert_claim(claim.clone())?;
        Ok(claim)
    }

    async fn claim_seat_with_version_check(
        &self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<(Seat, Claim), StoreError> {
        injected_failure(&self.fail_writes, "claim_seat_with_version_check")?;
        let _row = self
            .row_lock(seat.id)?
            .ok_or(StoreError::SeatNotFound(seat.id))?
            .lock_owned()
            .await;
        let mut tables = self.tables()?;

        let stored = tables
            .seats
            .get(&seat.id)
            .cloned()
            .ok_or(StoreError::SeatNotFound(seat.id))?;
        if stored.version != seat.version {
            return Err(StoreError::VersionConflict {
                seat_id: seat.id,
                expected: seat.version,
                actual: stored.version,
            });
        }
        if tables.claim_by_seat.contains_key(&seat.id) {
            return Err(StoreError::DuplicateClaim(seat.id));
        }
        // Nothing is applied until both halves are known to succeed.
        injected_failure(&self.fail_claims, "claim_seat_with_version_check")?;

        let written = Seat {
            claimed: seat.claimed,
            seat_number: seat.seat_number,
            version: stored.version + 1,
            ..stored
        };
        let claim = Claim {
            id: tables.next_claim_id(),
            seat_id: seat.id,
            claimant_id: claimant_id.clone(),
            claimed_at,
        };
        tables.insert_claim(claim.clone())?;
        tables.seats.insert(written.id, written.clone());
        Ok((written, claim))
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError> {
        let mut tables = self.tables()?;
        let group = Group {
            id: tables.next_group_id(),
            name: group.name,
            date: group.date,
            total_seats: group.total_seats,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn create_seat(&self, seat: NewSeat) -> Result<Seat, StoreError> {
        let mut tables = self.tables()?;
        if !tables.groups.contains_key(&seat.group_id) {
            return Err(StoreError::GroupNotFound(seat.group_id));
        }

        let seat = Seat {
            id: tables.next_seat_id(),
            group_id: seat.group_id,
            seat_number: seat.seat_number,
            claimed: false,
            version: INITIAL_SEAT_VERSION,
        };
        tables.seats.insert(seat.id, seat.clone());
        Ok(seat)
    }

    async fn find_group(&self, group_id: GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.tables()?.groups.get(&group_id).cloned())
    }

    async fn find_claim_by_seat(&self, seat_id: SeatId) -> Result<Option<Claim>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .claim_by_seat
            .get(&seat_id)
            .and_then(|id| tables.claims.get(id))
            .cloned())
    }

    async fn count_claims_for_seat(&self, seat_id: SeatId) -> Result<u64, StoreError> {
        let tables = self.tables()?;
        let count = tables
            .claims
            .values()
            .filter(|claim| claim.seat_id == seat_id)
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::fixtures::seed_single_seat;
    use crate::test_clock;
    use seatlock_core::environment::Clock;
    use std::time::Duration;

    #[tokio::test]
    async fn version_check_accepts_matching_version_and_bumps_it() {
        let store = InMemorySeatStore::new();
        let (_, seat) = seed_single_seat(&store).await.unwrap();

        let saved = store
            .save_seat_with_version_check(&seat.mark_claimed())
            .await
            .unwrap();

        assert!(saved.claimed);
        assert_eq!(saved.version, seat.version + 1);
        assert_eq!(store.seat(seat.id), Some(saved));
    }

    #[tokio::test]
    async fn version_check_rejects_stale_snapshot() {
        let store = InMemorySeatStore::new();
        let (_, seat) = seed_single_seat(&store).await.unwrap();

        store
            .save_seat_with_version_check(&seat.mark_claimed())
            .await
            .unwrap();
        let result = store.save_seat_with_version_check(&seat.mark_claimed()).await;

        assert_eq!(
            result,
            Err(StoreError::VersionConflict {
                seat_id: seat.id,
                expected: 1,
                actual: 2,
            })
        );
    }

    #[tokio::test]
    async fn second_claim_for_same_seat_is_rejected() {
        let store = InMemorySeatStore::new();
        let (_, seat) = seed_single_seat(&store).await.unwrap();
        let now = test_clock().now();

        store
            .create_claim(&seat, &ClaimantId::from("user_1"), now)
            .await
            .unwrap();
        let result = store
            .create_claim(&seat, &ClaimantId::from("user_2"), now)
            .await;

        assert_eq!(result, Err(StoreError::DuplicateClaim(seat.id)));
        assert_eq!(store.count_claims_for_seat(seat.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn read_seat_is_scoped_to_group() {
        let store = InMemorySeatStore::new();
        let (group, seat) = seed_single_seat(&store).await.unwrap();

        let other_group = GroupId::new(group.id.get() + 1);
        assert!(store.read_seat(group.id, seat.id).await.unwrap().is_some());
        assert!(store.read_seat(other_group, seat.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_guard_discards_writes() {
        let store = InMemorySeatStore::new();
        let (group, seat) = seed_single_seat(&store).await.unwrap();

        {
            let mut locked = store.lock_seat(group.id, seat.id).await.unwrap();
            let current = locked.seat().cloned().unwrap();
            locked.save_seat(&current.mark_claimed()).await.unwrap();
            locked
                .create_claim(&current, &ClaimantId::from("user_1"), test_clock().now())
                .await
                .unwrap();
        }

        assert_eq!(store.seat(seat.id), Some(seat));
        assert_eq!(store.claim_count(), 0);
    }

    #[tokio::test]
    async fn committed_guard_applies_writes() {
        let store = InMemorySeatStore::new();
        let (group, seat) = seed_single_seat(&store).await.unwrap();

        let mut locked = store.lock_seat(group.id, seat.id).await.unwrap();
        let current = locked.seat().cloned().unwrap();
        let written = locked.save_seat(&current.mark_claimed()).await.unwrap();
        locked
            .create_claim(&written, &ClaimantId::from("user_1"), test_clock().now())
            .await
            .unwrap();
        locked.commit().await.unwrap();

        let stored = store.seat(seat.id).unwrap();
        assert!(stored.claimed);
        assert_eq!(stored.version, 2);
        assert_eq!(
            store.find_claim_by_seat(seat.id).await.unwrap().unwrap().claimant_id,
            ClaimantId::from("user_1")
        );
    }

    #[tokio::test]
    async fn lock_seat_waits_for_previous_holder() {
        let store = InMemorySeatStore::new();
        let (group, seat) = seed_single_seat(&store).await.unwrap();

        let first = store.lock_seat(group.id, seat.id).await.unwrap();

        let contender = store.clone();
        let waiter = tokio::spawn(async move { contender.lock_seat(group.id, seat.id).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "second locker must wait");

        first.rollback().await.unwrap();
        let second = waiter.await.unwrap().unwrap();
        assert_eq!(second.seat(), Some(&seat));
    }

    #[tokio::test]
    async fn create_seat_requires_existing_group() {
        let store = InMemorySeatStore::new();
        let result = store
            .create_seat(NewSeat {
                group_id: GroupId::new(404),
                seat_number: 1,
            })
            .await;

        assert_eq!(result, Err(StoreError::GroupNotFound(GroupId::new(404))));
    }

    #[tokio::test]
    async fn injected_write_failure_leaves_state_untouched() {
        let store = InMemorySeatStore::new();
        let (_, seat) = seed_single_seat(&store).await.unwrap();
        store.fail_writes(true);

        assert!(matches!(
            store.save_seat_with_version_check(&seat.mark_claimed()).await,
            Err(StoreError::DatabaseError(_))
        ));
        assert!(matches!(
            store.create_claim(&seat, &ClaimantId::from("user_1"), test_clock().now()).await,
            Err(StoreError::DatabaseError(_))
        ));
        assert_eq!(store.seat(seat.id), Some(seat));
        assert_eq!(store.claim_count(), 0);
    }

    #[tokio::test]
    async fn with_exclusive_lock_commits_on_ok_and_rolls_back_on_err() {
        use seatlock_core::store::with_exclusive_lock;

        let store = InMemorySeatStore::new();
        let (group, seat) = seed_single_seat(&store).await.unwrap();
        let seat_id = seat.id;

        let aborted: Result<(), StoreError> =
            with_exclusive_lock(&store, group.id, seat_id, move |locked| {
                Box::pin(async move {
                    let current = locked.seat().cloned().ok_or(StoreError::SeatNotFound(seat_id))?;
                    locked.save_seat(&current.mark_claimed()).await?;
                    Err(StoreError::DatabaseError("abort".into()))
                })
            })
            .await;
        assert!(aborted.is_err());
        assert_eq!(store.seat(seat.id), Some(seat.clone()));

        let saved = with_exclusive_lock(&store, group.id, seat_id, move |locked| {
            Box::pin(async move {
                let current = locked.seat().cloned().ok_or(StoreError::SeatNotFound(seat_id))?;
                locked.save_seat(&current.mark_claimed()).await
            })
        })
        .await
        .unwrap();
        assert_eq!(store.seat(seat.id), Some(saved));
    }

    #[tokio::test]
    async fn combined_claim_applies_seat_and_claim_together() {
        let store = InMemorySeatStore::new();
        let (_, seat) = seed_single_seat(&store).await.unwrap();

        let (written, claim) = store
            .claim_seat_with_version_check(
                &seat.mark_claimed(),
                &ClaimantId::from("user_1"),
                test_clock().now(),
            )
            .await
            .unwrap();

        assert_eq!(written.version, seat.version + 1);
        assert_eq!(store.seat(seat.id), Some(written));
        assert_eq!(store.claims(), vec![claim]);
    }

    #[tokio::test]
    async fn failed_claim_insert_leaves_seat_unwritten() {
        let store = InMemorySeatStore::new();
        let (_, seat) = seed_single_seat(&store).await.unwrap();
        store.fail_claims(true);

        let result = store
            .claim_seat_with_version_check(
                &seat.mark_claimed(),
                &ClaimantId::from("user_1"),
                test_clock().now(),
            )
            .await;

        assert!(matches!(result, Err(StoreError::DatabaseError(_))));
        assert_eq!(store.seat(seat.id), Some(seat.clone()));
        assert_eq!(store.claim_count(), 0);

        store.fail_claims(false);
        store
            .claim_seat_with_version_check(
                &seat.mark_claimed(),
                &ClaimantId::from("user_2"),
                test_clock().now(),
            )
            .await
            .unwrap();
        assert!(store.seat(seat.id).unwrap().claimed);
    }

    #[tokio::test]
    async fn claim_failure_does_not_block_plain_seat_writes() {
        let store = InMemorySeatStore::new();
        let (_, seat) = seed_single_seat(&store).await.unwrap();
        store.fail_claims(true);

        store
            .save_seat_with_version_check(&seat.mark_claimed())
            .await
            .unwrap();
        assert!(matches!(
            store.create_claim(&seat, &ClaimantId::from("user_1"), test_clock().now()).await,
            Err(StoreError::DatabaseError(_))
        ));
    }

    #[tokio::test]
    async fn lookups_of_missing_seats_leave_no_row_lock() {
        let store = InMemorySeatStore::new();
        let (group, seat) = seed_single_seat(&store).await.unwrap();
        let missing = SeatId::new(999);

        let locked = store.lock_seat(group.id, missing).await.unwrap();
        assert!(locked.seat().is_none());
        locked.rollback().await.unwrap();

        let mut ghost = seat.mark_claimed();
        ghost.id = missing;
        assert_eq!(
            store.save_seat_with_version_check(&ghost).await,
            Err(StoreError::SeatNotFound(missing))
        );
        assert!(store.row_locks.lock().unwrap().is_empty());

        store.lock_seat(group.id, seat.id).await.unwrap().rollback().await.unwrap();
        assert_eq!(store.row_locks.lock().unwrap().len(), 1);
    }
}
