//! `PostgreSQL` seat store.
//!
//! Implements [`SeatStore`] on top of a `sqlx` connection pool:
//!
//! - Exclusive row lock: `SELECT ... FOR UPDATE` inside a transaction held by
//!   [`PostgresLockedSeat`]. The row stays locked until the transaction
//!   commits or rolls back; dropping the guard rolls back.
//! - Version check: `UPDATE ... WHERE id = $1 AND version = $2`, bumping the
//!   version in the same statement. Zero affected rows means the seat was
//!   written since it was read (or does not exist).
//! - Combined claim: the same versioned `UPDATE` followed by the claim
//!   `INSERT` in one transaction, so a failed insert undoes the seat write.
//! - Claim uniqueness: `claims_seat_id_key` unique constraint, surfaced as
//!   [`StoreError::DuplicateClaim`].

use chrono::{DateTime, NaiveDate, Utc};
use seatlock_core::store::{LockedSeat, SeatStore, StoreError};
use seatlock_core::types::{Claim, ClaimId, ClaimantId, Group, GroupId, NewGroup, NewSeat, Seat, SeatId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

const SEAT_COLUMNS: &str = "id, group_id, seat_number, claimed, version";
const CLAIM_COLUMNS: &str = "id, seat_id, claimant_id, claimed_at";

/// `$1` id, `$2` expected version, `$3` claimed, `$4` seat number.
fn versioned_update_sql() -> String {
    format!(
        "UPDATE seats SET claimed = $3, seat_number = $4, version = version + 1 \
         WHERE id = $1 AND version = $2 RETURNING {SEAT_COLUMNS}"
    )
}

fn insert_claim_sql() -> String {
    format!(
        "INSERT INTO claims (seat_id, claimant_id, claimed_at) VALUES ($1, $2, $3) \
         RETURNING {CLAIM_COLUMNS}"
    )
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: i64,
    group_id: i64,
    seat_number: i32,
    claimed: bool,
    version: i64,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Self {
            id: SeatId::new(row.id),
            group_id: GroupId::new(row.group_id),
            seat_number: row.seat_number,
            claimed: row.claimed,
            version: row.version,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ClaimRow {
    id: i64,
    seat_id: i64,
    claimant_id: String,
    claimed_at: DateTime<Utc>,
}

impl From<ClaimRow> for Claim {
    fn from(row: ClaimRow) -> Self {
        Self {
            id: ClaimId::new(row.id),
            seat_id: SeatId::new(row.seat_id),
            claimant_id: ClaimantId::from(row.claimant_id),
            claimed_at: row.claimed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    date: NaiveDate,
    total_seats: i32,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: GroupId::new(row.id),
            name: row.name,
            date: row.date,
            total_seats: row.total_seats,
        }
    }
}

fn database_error(context: &str, error: &sqlx::Error) -> StoreError {
    StoreError::DatabaseError(format!("{context}: {error}"))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Map an insert error on `claims` to the store taxonomy.
fn claim_insert_error(seat_id: SeatId, error: &sqlx::Error) -> StoreError {
    if is_unique_violation(error) {
        metrics::counter!("seatlock_store_duplicate_claims_total").increment(1);
        tracing::debug!(seat_id = %seat_id, "Claim rejected by unique constraint");
        return StoreError::DuplicateClaim(seat_id);
    }
    if is_foreign_key_violation(error) {
        return StoreError::SeatNotFound(seat_id);
    }
    database_error("Failed to create claim", error)
}

/// `PostgreSQL`-backed [`SeatStore`].
///
/// # Example
///
/// ```no_run
/// use seatlock_postgres::PostgresSeatStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresSeatStore::new("postgres://localhost/seatlock").await?;
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresSeatStore {
    pool: PgPool,
}

impl PostgresSeatStore {
    /// Connect to `PostgreSQL` with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| database_error("Failed to connect", &e))?;
        Ok(Self::from_pool(pool))
    }

    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// Creates the `groups`, `seats` and `claims` tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if migrations fail.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Explain why a versioned update matched no row.
    async fn version_check_failure(&self, seat: &Seat) -> StoreError {
        let current: Result<Option<(i64,)>, _> =
            sqlx::query_as("SELECT version FROM seats WHERE id = $1")
                .bind(seat.id.get())
                .fetch_optional(&self.pool)
                .await;

        match current {
            Ok(Some((actual,))) => {
                metrics::counter!("seatlock_store_version_conflicts_total").increment(1);
                tracing::debug!(
                    seat_id = %seat.id,
                    expected = seat.version,
                    actual = actual,
                    "Optimistic version check failed"
                );
                StoreError::VersionConflict {
                    seat_id: seat.id,
                    expected: seat.version,
                    actual,
                }
            }
            Ok(None) => StoreError::SeatNotFound(seat.id),
            Err(e) => database_error("Failed to read seat version", &e),
        }
    }
}

/// Open transaction holding `FOR UPDATE` on one seat row.
pub struct PostgresLockedSeat {
    tx: Transaction<'static, Postgres>,
    seat: Option<Seat>,
}

impl LockedSeat for PostgresLockedSeat {
    fn seat(&self) -> Option<&Seat> {
        self.seat.as_ref()
    }

    async fn save_seat(&mut self, seat: &Seat) -> Result<Seat, StoreError> {
        if self.seat.as_ref().map(|locked| locked.id) != Some(seat.id) {
            return Err(StoreError::SeatNotFound(seat.id));
        }

        let written: Seat = sqlx::query_as::<_, SeatRow>(&format!(
            "UPDATE seats SET claimed = $2, seat_number = $3, version = version + 1 \
             WHERE id = $1 RETURNING {SEAT_COLUMNS}"
        ))
        .bind(seat.id.get())
        .bind(seat.claimed)
        .bind(seat.seat_number)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| database_error("Failed to update locked seat", &e))?
        .ok_or(StoreError::SeatNotFound(seat.id))?
        .into();

        self.seat = Some(written.clone());
        Ok(written)
    }

    async fn create_claim(
        &mut self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<Claim, StoreError> {
        let row = sqlx::query_as::<_, ClaimRow>(&insert_claim_sql())
            .bind(seat.id.get())
            .bind(claimant_id.as_str())
            .bind(claimed_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| claim_insert_error(seat.id, &e))?;

        Ok(row.into())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| database_error("Failed to commit transaction", &e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| database_error("Failed to roll back transaction", &e))
    }
}

impl SeatStore for PostgresSeatStore {
    type Locked = PostgresLockedSeat;

    async fn lock_seat(
        &self,
        group_id: GroupId,
        seat_id: SeatId,
    ) -> Result<PostgresLockedSeat, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to start transaction", &e))?;

        // Blocks here while another transaction holds the row.
        let seat = sqlx::query_as::<_, SeatRow>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE id = $1 AND group_id = $2 FOR UPDATE"
        ))
        .bind(seat_id.get())
        .bind(group_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| database_error("Failed to lock seat", &e))?
        .map(Seat::from);

        tracing::trace!(seat_id = %seat_id, found = seat.is_some(), "Seat row locked");

        Ok(PostgresLockedSeat { tx, seat })
    }

    async fn read_seat(&self, group_id: GroupId, seat_id: SeatId) -> Result<Option<Seat>, StoreError> {
        let row = sqlx::query_as::<_, SeatRow>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE id = $1 AND group_id = $2"
        ))
        .bind(seat_id.get())
        .bind(group_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("Failed to read seat", &e))?;

        Ok(row.map(Seat::from))
    }

    async fn save_seat_with_version_check(&self, seat: &Seat) -> Result<Seat, StoreError> {
        let row = sqlx::query_as::<_, SeatRow>(&versioned_update_sql())
            .bind(seat.id.get())
            .bind(seat.version)
            .bind(seat.claimed)
            .bind(seat.seat_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("Failed to update seat", &e))?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(self.version_check_failure(seat).await),
        }
    }

    async fn claim_seat_with_version_check(
        &self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<(Seat, Claim), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to start transaction", &e))?;

        let row = sqlx::query_as::<_, SeatRow>(&versioned_update_sql())
            .bind(seat.id.get())
            .bind(seat.version)
            .bind(seat.claimed)
            .bind(seat.seat_number)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| database_error("Failed to update seat", &e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| database_error("Failed to roll back transaction", &e))?;
            return Err(self.version_check_failure(seat).await);
        };

        // An insert error drops `tx`, which rolls the seat update back.
        let claim = sqlx::query_as::<_, ClaimRow>(&insert_claim_sql())
            .bind(seat.id.get())
            .bind(claimant_id.as_str())
            .bind(claimed_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| claim_insert_error(seat.id, &e))?;

        tx.commit()
            .await
            .map_err(|e| database_error("Failed to commit transaction", &e))?;

        Ok((row.into(), claim.into()))
    }

    async fn create_claim(
        &self,
        seat: &Seat,
        claimant_id: &ClaimantId,
        claimed_at: DateTime<Utc>,
    ) -> Result<Claim, StoreError> {
        let row = sqlx::query_as::<_, ClaimRow>(&insert_claim_sql())
            .bind(seat.id.get())
            .bind(claimant_id.as_str())
            .bind(claimed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| claim_insert_error(seat.id, &e))?;

        Ok(row.into())
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(
            r"
            INSERT INTO groups (name, date, total_seats)
            VALUES ($1, $2, $3)
            RETURNING id, name, date, total_seats
            ",
        )
        .bind(&group.name)
        .bind(group.date)
        .bind(group.total_seats)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("Failed to create group", &e))?;

        Ok(row.into())
    }

    async fn create_seat(&self, seat: NewSeat) -> Result<Seat, StoreError> {
        let row = sqlx::query_as::<_, SeatRow>(&format!(
            "INSERT INTO seats (group_id, seat_number) VALUES ($1, $2) RETURNING {SEAT_COLUMNS}"
        ))
        .bind(seat.group_id.get())
        .bind(seat.seat_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::GroupNotFound(seat.group_id)
            } else {
                database_error("Failed to create seat", &e)
            }
        })?;

        Ok(row.into())
    }

    async fn find_group(&self, group_id: GroupId) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, date, total_seats FROM groups WHERE id = $1",
        )
        .bind(group_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("Failed to get group", &e))?;

        Ok(row.map(Group::from))
    }

    async fn find_claim_by_seat(&self, seat_id: SeatId) -> Result<Option<Claim>, StoreError> {
        let row = sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims WHERE seat_id = $1"
        ))
        .bind(seat_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("Failed to get claim", &e))?;

        Ok(row.map(Claim::from))
    }

    async fn count_claims_for_seat(&self, seat_id: SeatId) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM claims WHERE seat_id = $1")
            .bind(seat_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("Failed to count claims", &e))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
