//! PostgreSQL implementation of the store ports.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::models::{CandidateRow, ChairLocationRow, ChairRow, RideRow, StatusRow};
use super::{AssignOutcome, Store, StoreTx};
use crate::config::ServiceConfig;
use crate::domain::{
    Chair, ChairCandidate, ChairId, ChairLocation, Coordinate, Evaluation, Ride, RideId,
    RideStatus, StatusEvent, UserId,
};
use crate::error::ServiceError;

const RIDE_COLUMNS: &str = "id, user_id, chair_id, pickup_latitude, pickup_longitude, \
     destination_latitude, destination_longitude, evaluation, created_at, updated_at";

/// A ride counts as canceled once any `CANCELED` event exists for it.
const NOT_CANCELED: &str = "NOT EXISTS (SELECT 1 FROM ride_statuses s \
     WHERE s.ride_id = rides.id AND s.status = 'CANCELED')";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the database cannot be
    /// reached within the configured timeout.
    pub async fn connect(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ServiceError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, ServiceError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn unmatched_rides(&self, limit: usize) -> Result<Vec<Ride>, ServiceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides \
             WHERE chair_id IS NULL AND {NOT_CANCELED} \
             ORDER BY created_at ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ride::from).collect())
    }

    async fn dispatch_candidates(&self) -> Result<Vec<ChairCandidate>, ServiceError> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT c.id, m.speed, l.latitude, l.longitude \
             FROM chairs c \
             JOIN chair_models m ON m.name = c.model \
             JOIN chair_locations l ON l.chair_id = c.id \
             LEFT JOIN chair_availabilities a ON a.chair_id = c.id \
             WHERE c.is_active AND m.speed > 0 AND COALESCE(a.is_available, TRUE)",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChairCandidate::from).collect())
    }

    async fn assign_chair(
        &self,
        ride_id: RideId,
        chair_id: ChairId,
    ) -> Result<AssignOutcome, ServiceError> {
        // Chair first, then ride: every cycle locks in the same order.
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "INSERT INTO chair_availabilities (chair_id, is_available, updated_at) \
             SELECT id, FALSE, clock_timestamp() FROM chairs WHERE id = $1 AND is_active \
             ON CONFLICT (chair_id) DO UPDATE \
             SET is_available = FALSE, updated_at = EXCLUDED.updated_at \
             WHERE chair_availabilities.is_available",
        )
        .bind(chair_id.as_uuid())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(AssignOutcome::ChairUnavailable);
        }

        // Lock the ride in its own statement so the update below reads a
        // snapshot that includes any cancellation committed meanwhile.
        let locked = sqlx::query("SELECT id FROM rides WHERE id = $1 AND chair_id IS NULL FOR UPDATE")
            .bind(ride_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(AssignOutcome::RideTaken);
        }

        let matched = sqlx::query(&format!(
            "UPDATE rides SET chair_id = $2, updated_at = clock_timestamp() \
             WHERE id = $1 AND chair_id IS NULL AND {NOT_CANCELED}"
        ))
        .bind(ride_id.as_uuid())
        .bind(chair_id.as_uuid())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if matched == 0 {
            tx.rollback().await?;
            return Ok(AssignOutcome::RideTaken);
        }

        tx.commit().await?;
        Ok(AssignOutcome::Assigned)
    }

    async fn chair_by_token(&self, token: &str) -> Result<Option<Chair>, ServiceError> {
        let row = sqlx::query_as::<_, ChairRow>(
            "SELECT id, owner_id, name, model, is_active, access_token \
             FROM chairs WHERE access_token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Chair::from))
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<UserId>, ServiceError> {
        let id = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM users WHERE access_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id.map(UserId::from_uuid))
    }
}

/// A PostgreSQL transaction. Dropped without commit, it rolls back.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

impl fmt::Debug for PgStoreTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStoreTx").finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn ride_for_update(&mut self, ride_id: RideId) -> Result<Option<Ride>, ServiceError> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1 FOR UPDATE"
        ))
        .bind(ride_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Ride::from))
    }

    async fn insert_ride(&mut self, ride: &Ride) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO rides (id, user_id, chair_id, pickup_latitude, pickup_longitude, \
             destination_latitude, destination_longitude, evaluation, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(ride.id.as_uuid())
        .bind(ride.user_id.as_uuid())
        .bind(ride.chair_id.map(uuid::Uuid::from))
        .bind(ride.pickup.latitude)
        .bind(ride.pickup.longitude)
        .bind(ride.destination.latitude)
        .bind(ride.destination.longitude)
        .bind(ride.evaluation)
        .bind(ride.created_at)
        .bind(ride.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn latest_ride_for_chair(
        &mut self,
        chair_id: ChairId,
    ) -> Result<Option<Ride>, ServiceError> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE chair_id = $1 \
             ORDER BY updated_at DESC, created_at DESC LIMIT 1 FOR UPDATE"
        ))
        .bind(chair_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Ride::from))
    }

    async fn has_active_ride(&mut self, user_id: UserId) -> Result<bool, ServiceError> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM rides r WHERE r.user_id = $1 AND ( \
                     SELECT s.status FROM ride_statuses s WHERE s.ride_id = r.id \
                     ORDER BY s.seq DESC LIMIT 1 \
                 ) NOT IN ('COMPLETED', 'CANCELED'))",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(active)
    }

    async fn set_evaluation(
        &mut self,
        ride_id: RideId,
        evaluation: Evaluation,
    ) -> Result<Ride, ServiceError> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "UPDATE rides SET evaluation = $2, updated_at = clock_timestamp() \
             WHERE id = $1 RETURNING {RIDE_COLUMNS}"
        ))
        .bind(ride_id.as_uuid())
        .bind(evaluation.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Ride::from)
            .ok_or_else(|| ServiceError::NotFound(format!("ride {ride_id} not found")))
    }

    async fn advance_chair_location(
        &mut self,
        chair_id: ChairId,
        position: Coordinate,
    ) -> Result<ChairLocation, ServiceError> {
        // Manhattan increment, same metric as `Coordinate::distance_to`.
        let row = sqlx::query_as::<_, ChairLocationRow>(
            "INSERT INTO chair_locations (chair_id, latitude, longitude, total_distance, updated_at) \
             VALUES ($1, $2, $3, 0, clock_timestamp()) \
             ON CONFLICT (chair_id) DO UPDATE SET \
                 total_distance = chair_locations.total_distance \
                     + ABS(EXCLUDED.latitude::BIGINT - chair_locations.latitude::BIGINT) \
                     + ABS(EXCLUDED.longitude::BIGINT - chair_locations.longitude::BIGINT), \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING chair_id, latitude, longitude, total_distance, updated_at",
        )
        .bind(chair_id.as_uuid())
        .bind(position.latitude)
        .bind(position.longitude)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(ChairLocation::from(row))
    }

    async fn latest_status(
        &mut self,
        ride_id: RideId,
    ) -> Result<Option<StatusEvent>, ServiceError> {
        let row = sqlx::query_as::<_, StatusRow>(
            "SELECT seq, ride_id, status, created_at FROM ride_statuses \
             WHERE ride_id = $1 ORDER BY seq DESC LIMIT 1",
        )
        .bind(ride_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(StatusEvent::try_from).transpose()
    }

    async fn append_status(
        &mut self,
        ride_id: RideId,
        status: RideStatus,
    ) -> Result<StatusEvent, ServiceError> {
        let row = sqlx::query_as::<_, StatusRow>(
            "INSERT INTO ride_statuses (ride_id, status, created_at) \
             VALUES ($1, $2, clock_timestamp()) \
             RETURNING seq, ride_id, status, created_at",
        )
        .bind(ride_id.as_uuid())
        .bind(status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        StatusEvent::try_from(row)
    }

    async fn set_chair_available(
        &mut self,
        chair_id: ChairId,
        available: bool,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO chair_availabilities (chair_id, is_available, updated_at) \
             VALUES ($1, $2, clock_timestamp()) \
             ON CONFLICT (chair_id) DO UPDATE \
             SET is_available = EXCLUDED.is_available, updated_at = EXCLUDED.updated_at",
        )
        .bind(chair_id.as_uuid())
        .bind(available)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn payment_token(&mut self, user_id: UserId) -> Result<Option<String>, ServiceError> {
        let token =
            sqlx::query_scalar::<_, String>("SELECT token FROM payment_tokens WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(token)
    }

    async fn commit(self: Box<Self>) -> Result<(), ServiceError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ServiceError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
