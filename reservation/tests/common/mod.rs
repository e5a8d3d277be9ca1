//! Shared helpers for reservation scenario tests.

#![allow(dead_code, clippy::expect_used)]

use seatlock_core::types::{ClaimId, ClaimantId, GroupId, SeatId};
use seatlock_reservation::{ReservationEnvironment, ReservationError, ReservationService, StrategyKind};
use seatlock_testing::{InMemoryLockCoordinator, InMemorySeatStore, test_clock};
use std::sync::Arc;
use std::time::Duration;

/// Service over the in-memory backends.
pub type TestService = ReservationService<InMemorySeatStore, InMemoryLockCoordinator>;

/// Lock TTL used by the scenarios.
pub const LOCK_TTL: Duration = Duration::from_secs(10);

/// Build a service over fresh in-memory backends.
///
/// Returns the coordinator too so tests can inspect lock keys.
pub fn service(processing_delay: Duration) -> (TestService, Arc<InMemoryLockCoordinator>) {
    seatlock_testing::init_test_tracing();

    let coordinator = Arc::new(InMemoryLockCoordinator::new());
    let service = ReservationService::new(
        Arc::new(InMemorySeatStore::new()),
        Arc::clone(&coordinator),
        ReservationEnvironment::new(Arc::new(test_clock()), processing_delay),
        LOCK_TTL,
    );
    (service, coordinator)
}

/// Launch `attempts` concurrent reservations for one seat, each with a
/// distinct claimant, and wait for all of them.
pub async fn race(
    service: &TestService,
    kind: StrategyKind,
    group_id: GroupId,
    seat_id: SeatId,
    attempts: usize,
) -> Vec<Result<ClaimId, ReservationError>> {
    let handles: Vec<_> = (0..attempts)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                let claimant = ClaimantId::new(format!("user_{i}"));
                service.reserve(kind, group_id, seat_id, &claimant).await
            })
        })
        .collect();

    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("reservation task panicked"))
        .collect()
}

/// Outcome counts of a race.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub claimed: usize,
    pub already_claimed: usize,
    pub conflicts: usize,
    pub other: usize,
}

impl Tally {
    pub fn of(results: &[Result<ClaimId, ReservationError>]) -> Self {
        results.iter().fold(Self::default(), |mut tally, result| {
            match result {
                Ok(_) => tally.claimed += 1,
                Err(e) if e.is_already_claimed() => tally.already_claimed += 1,
                Err(e) if e.is_conflict() => tally.conflicts += 1,
                Err(_) => tally.other += 1,
            }
            tally
        })
    }

    pub const fn failures(&self) -> usize {
        self.already_claimed + self.conflicts + self.other
    }
}
