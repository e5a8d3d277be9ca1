//! # Seatlock Core
//!
//! Core traits and types for seatlock.
//!
//! Seatlock lets many callers race to claim one uniquely identified seat and
//! guarantees that exactly one of them wins. This crate holds the pieces every
//! strategy shares:
//!
//! - **Types**: [`Group`], [`Seat`], [`Claim`] and their identifiers
//! - **Seat store**: [`SeatStore`] with exclusive row locks and version checks
//! - **Lock coordinator**: [`LockCoordinator`], a TTL-bounded external lock
//! - **Environment**: [`environment::Clock`] for injectable time
//!
//! The strategies themselves live in `seatlock-reservation`; concrete backends
//! live in `seatlock-postgres`, `seatlock-redis` and `seatlock-testing`.

pub mod lock;
pub mod store;
pub mod types;

pub use lock::{LockCoordinator, LockError};
pub use store::{BoxFuture, LockedSeat, SeatStore, StoreError, with_exclusive_lock};
pub use types::{
    Claim, ClaimId, ClaimantId, Group, GroupId, INITIAL_SEAT_VERSION, NewGroup, NewSeat, Seat,
    SeatId,
};

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};

/// Environment module - injectable dependencies
///
/// All external time reads go through [`Clock`](environment::Clock) so tests
/// can pin claim timestamps.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use seatlock_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = chrono::Utc::now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
