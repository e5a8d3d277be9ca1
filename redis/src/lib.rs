//! Redis lock coordinator for seatlock.
//!
//! Provides [`RedisLockCoordinator`], the production
//! [`LockCoordinator`](seatlock_core::lock::LockCoordinator):
//!
//! - **Acquire**: `SET key "locked" NX EX ttl`, a single atomic
//!   set-if-absent with expiry
//! - **Release**: `DEL key`, with no holder check
//!
//! # Example
//!
//! ```no_run
//! use seatlock_redis::RedisLockCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = RedisLockCoordinator::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod lock_coordinator;

pub use lock_coordinator::RedisLockCoordinator;
