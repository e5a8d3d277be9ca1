//! # Seatlock Reservation
//!
//! Three ways to let many concurrent callers race for one seat so that
//! exactly one of them wins:
//!
//! | Strategy | Synchronizes through | Losers see |
//! |----------|----------------------|------------|
//! | [`PessimisticReservation`] | exclusive row lock in the store | `AlreadyClaimed` |
//! | [`OptimisticReservation`] | version check in the store | `Conflict` or `AlreadyClaimed` |
//! | [`DistributedLockReservation`] | TTL lock in the coordinator | `Conflict` or `AlreadyClaimed` |
//!
//! All three implement [`ReservationStrategy`]; [`ReservationService`]
//! holds one of each and dispatches by [`StrategyKind`].
//!
//! ## Example
//!
//! ```no_run
//! use seatlock_reservation::{Config, ReservationService, StrategyKind};
//! use seatlock_core::{ClaimantId, GroupId, SeatId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ReservationService::connect(&Config::from_env()).await?;
//! service.store().migrate().await?;
//!
//! let claim_id = service
//!     .reserve(
//!         StrategyKind::Optimistic,
//!         GroupId::new(1),
//!         SeatId::new(1),
//!         &ClaimantId::from("user_1"),
//!     )
//!     .await?;
//! # let _ = claim_id;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod service;
pub mod strategies;
pub mod strategy;

pub use config::Config;
pub use environment::{DEFAULT_PROCESSING_DELAY, ReservationEnvironment};
pub use error::{ConflictReason, ReservationError};
pub use service::ReservationService;
pub use strategies::{
    DEFAULT_LOCK_TTL, DistributedLockReservation, OptimisticReservation, PessimisticReservation,
    seat_lock_key,
};
pub use strategy::{ParseStrategyError, ReservationStrategy, StrategyKind};
