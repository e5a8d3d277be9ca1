//! `PostgreSQL` seat store for seatlock.
//!
//! This crate provides the production [`SeatStore`](seatlock_core::store::SeatStore)
//! backed by `PostgreSQL` via sqlx. It supports:
//!
//! - Exclusive row locks (`SELECT ... FOR UPDATE`) held by a transaction guard
//! - Version-checked seat updates for optimistic concurrency
//! - A unique claim per seat enforced by the schema
//! - Embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use seatlock_postgres::PostgresSeatStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresSeatStore::new("postgres://localhost/seatlock").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod seat_store;

pub use seat_store::{PostgresLockedSeat, PostgresSeatStore};
