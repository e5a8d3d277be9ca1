//! The three reservation strategies.

pub mod distributed;
pub mod optimistic;
pub mod pessimistic;

pub use distributed::{DEFAULT_LOCK_TTL, DistributedLockReservation, seat_lock_key};
pub use optimistic::OptimisticReservation;
pub use pessimistic::PessimisticReservation;
