//! Dispatch to one strategy per attempt.

use crate::config::Config;
use crate::environment::ReservationEnvironment;
use crate::error::ReservationError;
use crate::strategies::{DistributedLockReservation, OptimisticReservation, PessimisticReservation};
use crate::strategy::{ReservationStrategy, StrategyKind};
use seatlock_core::lock::LockCoordinator;
use seatlock_core::store::{SeatStore, StoreError};
use seatlock_core::types::{ClaimId, ClaimantId, GroupId, SeatId};
use seatlock_postgres::PostgresSeatStore;
use seatlock_redis::RedisLockCoordinator;
use sqlx::postgres::PgPoolOptions;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// All three strategies over one store and one coordinator.
///
/// Stateless apart from its handles; clone it or wrap it in an `Arc` to
/// share it between tasks. Each call to [`reserve`](Self::reserve) runs
/// exactly one strategy.
pub struct ReservationService<S, L: ?Sized = dyn LockCoordinator> {
    store: Arc<S>,
    pessimistic: PessimisticReservation<S>,
    optimistic: OptimisticReservation<S>,
    distributed: DistributedLockReservation<S, L>,
    default_strategy: StrategyKind,
}

impl<S, L> ReservationService<S, L>
where
    S: SeatStore,
    L: LockCoordinator + ?Sized,
{
    /// Build the three strategies over shared backends.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        coordinator: Arc<L>,
        env: ReservationEnvironment,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            pessimistic: PessimisticReservation::new(Arc::clone(&store), env.clone()),
            optimistic: OptimisticReservation::new(Arc::clone(&store), env.clone()),
            distributed: DistributedLockReservation::new(Arc::clone(&store), coordinator, env, lock_ttl),
            store,
            default_strategy: StrategyKind::Pessimistic,
        }
    }

    /// Set the strategy used by [`reserve_default`](Self::reserve_default).
    #[must_use]
    pub const fn with_default_strategy(mut self, kind: StrategyKind) -> Self {
        self.default_strategy = kind;
        self
    }

    /// The shared seat store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The strategy used when the caller does not pick one.
    #[must_use]
    pub const fn default_strategy(&self) -> StrategyKind {
        self.default_strategy
    }

    /// The exclusive row lock strategy.
    #[must_use]
    pub const fn pessimistic(&self) -> &PessimisticReservation<S> {
        &self.pessimistic
    }

    /// The optimistic version-check strategy.
    #[must_use]
    pub const fn optimistic(&self) -> &OptimisticReservation<S> {
        &self.optimistic
    }

    /// The distributed TTL lock strategy.
    #[must_use]
    pub const fn distributed(&self) -> &DistributedLockReservation<S, L> {
        &self.distributed
    }

    /// Claim a seat using the chosen strategy.
    ///
    /// # Errors
    ///
    /// Returns the strategy's [`ReservationError`].
    pub async fn reserve(
        &self,
        kind: StrategyKind,
        group_id: GroupId,
        seat_id: SeatId,
        claimant_id: &ClaimantId,
    ) -> Result<ClaimId, ReservationError> {
        match kind {
            StrategyKind::Pessimistic => self.pessimistic.reserve(group_id, seat_id, claimant_id).await,
            StrategyKind::Optimistic => self.optimistic.reserve(group_id, seat_id, claimant_id).await,
            StrategyKind::Distributed => self.distributed.reserve(group_id, seat_id, claimant_id).await,
        }
    }

    /// Claim a seat using the default strategy.
    ///
    /// # Errors
    ///
    /// Returns the strategy's [`ReservationError`].
    pub async fn reserve_default(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
        claimant_id: &ClaimantId,
    ) -> Result<ClaimId, ReservationError> {
        self.reserve(self.default_strategy, group_id, seat_id, claimant_id)
            .await
    }
}

impl<S, L: ?Sized> Clone for ReservationService<S, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pessimistic: self.pessimistic.clone(),
            optimistic: self.optimistic.clone(),
            distributed: self.distributed.clone(),
            default_strategy: self.default_strategy,
        }
    }
}

impl<S, L: ?Sized> fmt::Debug for ReservationService<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReservationService")
            .field("default_strategy", &self.default_strategy)
            .field("distributed", &self.distributed)
            .finish_non_exhaustive()
    }
}

impl ReservationService<PostgresSeatStore, RedisLockCoordinator> {
    /// Connect to Postgres and Redis and build the production service.
    ///
    /// Does not run migrations; call
    /// [`PostgresSeatStore::migrate`] on [`store`](Self::store) for that.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::Store`] if Postgres is unreachable and
    /// [`ReservationError::Lock`] if Redis is.
    pub async fn connect(config: &Config) -> Result<Self, ReservationError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.postgres.max_connections)
            .min_connections(config.postgres.min_connections)
            .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
            .connect(&config.postgres.url)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Failed to connect to Postgres: {e}")))?;
        tracing::info!(max_connections = config.postgres.max_connections, "PostgreSQL connected");

        let coordinator = RedisLockCoordinator::new(&config.redis.url).await?;
        tracing::info!("Redis connected");

        let env = ReservationEnvironment::production(config.reservation.processing_delay());

        Ok(Self::new(
            Arc::new(PostgresSeatStore::from_pool(pool)),
            Arc::new(coordinator),
            env,
            config.reservation.lock_ttl(),
        )
        .with_default_strategy(config.reservation.strategy))
    }
}
