//! Seed data shared by store and strategy tests.
//!
//! Works against any [`SeatStore`], so the same scenarios run on the
//! in-memory store and on Postgres.

use chrono::NaiveDate;
use seatlock_core::store::{SeatStore, StoreError};
use seatlock_core::types::{Group, NewGroup, NewSeat, Seat};

/// Name of the group created by the fixtures.
pub const TEST_GROUP_NAME: &str = "Test Concert";

/// Seat count recorded on the fixture group.
pub const TEST_GROUP_TOTAL_SEATS: i32 = 100;

/// Date of the fixture group (2025-03-01).
#[must_use]
pub fn test_group_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default()
}

/// Create the fixture group with a total of 100 seats and no seat rows.
///
/// # Errors
///
/// Propagates any store error.
pub async fn seed_group<S: SeatStore>(store: &S) -> Result<Group, StoreError> {
    store
        .create_group(NewGroup {
            name: TEST_GROUP_NAME.to_string(),
            date: test_group_date(),
            total_seats: TEST_GROUP_TOTAL_SEATS,
        })
        .await
}

/// Create the fixture group and a single unclaimed seat numbered 1.
///
/// This is the "last seat" contention scenario: many callers, one seat.
///
/// # Errors
///
/// Propagates any store error.
pub async fn seed_single_seat<S: SeatStore>(store: &S) -> Result<(Group, Seat), StoreError> {
    let group = seed_group(store).await?;
    let seat = store
        .create_seat(NewSeat {
            group_id: group.id,
            seat_number: 1,
        })
        .await?;
    Ok((group, seat))
}

/// Create the fixture group with `count` unclaimed seats numbered from 1.
///
/// # Errors
///
/// Propagates any store error.
pub async fn seed_seats<S: SeatStore>(store: &S, count: i32) -> Result<(Group, Vec<Seat>), StoreError> {
    let group = seed_group(store).await?;
    let mut seats = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
    for seat_number in 1..=count {
        seats.push(
            store
                .create_seat(NewSeat {
                    group_id: group.id,
                    seat_number,
                })
                .await?,
        );
    }
    Ok((group, seats))
}
