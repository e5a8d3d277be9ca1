//! Many callers, one seat: exactly one claim per strategy.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Tally, race, service};
use seatlock_core::store::SeatStore;
use seatlock_reservation::StrategyKind;
use seatlock_testing::fixtures::{TEST_GROUP_TOTAL_SEATS, seed_single_seat};
use std::time::Duration;

const ATTEMPTS: usize = 100;

/// Run the hundred-caller race and check the invariants shared by every
/// strategy. Returns the tally for strategy-specific checks.
async fn hundred_callers_one_seat(kind: StrategyKind, processing_delay: Duration) -> Tally {
    let (service, _coordinator) = service(processing_delay);
    let store = service.store();
    let (group, seat) = seed_single_seat(store.as_ref()).await.unwrap();
    assert_eq!(group.total_seats, TEST_GROUP_TOTAL_SEATS);

    let results = race(&service, kind, group.id, seat.id, ATTEMPTS).await;
    let tally = Tally::of(&results);

    assert_eq!(tally.claimed, 1, "{kind}: exactly one winner, got {tally:?}");
    assert_eq!(tally.failures(), ATTEMPTS - 1);
    assert_eq!(tally.other, 0, "{kind}: unexpected errors {tally:?}");

    assert_eq!(store.count_claims_for_seat(seat.id).await.unwrap(), 1);
    assert_eq!(store.claim_count(), 1);

    let winner = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
    let claim = store.find_claim_by_seat(seat.id).await.unwrap().unwrap();
    assert_eq!(claim.id, *winner);

    let stored = store.seat(seat.id).unwrap();
    assert!(stored.claimed);
    assert_eq!(stored.version, seat.version + 1, "{kind}: seat written exactly once");
    assert_eq!(store.find_group(group.id).await.unwrap(), Some(group));

    tally
}

#[tokio::test(start_paused = true)]
async fn pessimistic_losers_all_see_already_claimed() {
    let tally = hundred_callers_one_seat(StrategyKind::Pessimistic, Duration::from_millis(100)).await;

    assert_eq!(tally.already_claimed, ATTEMPTS - 1);
    assert_eq!(tally.conflicts, 0);
}

#[tokio::test(start_paused = true)]
async fn optimistic_losers_conflict_on_version() {
    let tally = hundred_callers_one_seat(StrategyKind::Optimistic, Duration::from_millis(100)).await;

    // Every attempt read the seat before the winner wrote it.
    assert_eq!(tally.conflicts, ATTEMPTS - 1);
}

#[tokio::test(start_paused = true)]
async fn distributed_losers_conflict_on_held_lock() {
    let tally = hundred_callers_one_seat(StrategyKind::Distributed, Duration::from_millis(100)).await;

    assert_eq!(tally.conflicts, ATTEMPTS - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn pessimistic_race_on_worker_threads() {
    let tally = hundred_callers_one_seat(StrategyKind::Pessimistic, Duration::from_millis(20)).await;

    assert_eq!(tally.already_claimed, ATTEMPTS - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn optimistic_race_on_worker_threads() {
    hundred_callers_one_seat(StrategyKind::Optimistic, Duration::from_millis(20)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn distributed_race_on_worker_threads() {
    hundred_callers_one_seat(StrategyKind::Distributed, Duration::from_millis(20)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn optimistic_race_without_processing_delay() {
    hundred_callers_one_seat(StrategyKind::Optimistic, Duration::ZERO).await;
}
