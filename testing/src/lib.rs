//! # Seatlock Testing
//!
//! Testing utilities and helpers for seatlock.
//!
//! This crate provides:
//! - [`InMemorySeatStore`]: a `SeatStore` with real per-row locking
//! - [`InMemoryLockCoordinator`]: a TTL lock table driven by tokio time
//! - [`FixedClock`]: deterministic claim timestamps
//! - [`fixtures`]: seed data usable against any store
//!
//! ## Example
//!
//! ```ignore
//! use seatlock_testing::{InMemorySeatStore, fixtures::seed_single_seat};
//!
//! #[tokio::test]
//! async fn test_single_seat() {
//!     let store = InMemorySeatStore::new();
//!     let (group, seat) = seed_single_seat(&store).await.unwrap();
//!     assert!(!seat.claimed);
//! }
//! ```

use chrono::{DateTime, Utc};
use seatlock_core::environment::Clock;

pub mod fixtures;
pub mod lock_coordinator;
pub mod seat_store;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use seatlock_testing::mocks::FixedClock;
    /// use seatlock_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default(),
        )
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; defaults to `warn`. Safe to call from every test, only
/// the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use lock_coordinator::InMemoryLockCoordinator;
pub use mocks::{FixedClock, test_clock};
pub use seat_store::{InMemoryLockedSeat, InMemorySeatStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
