//! Database row models and their conversion into domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Chair, ChairCandidate, ChairId, ChairLocation, Coordinate, OwnerId, Ride, RideId, RideStatus,
    StatusEvent, UserId,
};
use crate::error::ServiceError;

/// A row of the `rides` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RideRow {
    /// Ride id.
    pub id: Uuid,
    /// Requesting user.
    pub user_id: Uuid,
    /// Assigned chair.
    pub chair_id: Option<Uuid>,
    /// Pickup latitude.
    pub pickup_latitude: i32,
    /// Pickup longitude.
    pub pickup_longitude: i32,
    /// Destination latitude.
    pub destination_latitude: i32,
    /// Destination longitude.
    pub destination_longitude: i32,
    /// Rider evaluation.
    pub evaluation: Option<i32>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<RideRow> for Ride {
    fn from(row: RideRow) -> Self {
        Self {
            id: RideId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            chair_id: row.chair_id.map(ChairId::from_uuid),
            pickup: Coordinate::new(row.pickup_latitude, row.pickup_longitude),
            destination: Coordinate::new(row.destination_latitude, row.destination_longitude),
            evaluation: row.evaluation,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row of the `ride_statuses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusRow {
    /// Ledger sequence.
    pub seq: i64,
    /// Ride id.
    pub ride_id: Uuid,
    /// Status string as stored.
    pub status: String,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StatusRow> for StatusEvent {
    type Error = ServiceError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        let status: RideStatus = row.status.parse().map_err(|_| {
            ServiceError::InternalInconsistency(format!(
                "unknown status {:?} stored for ride {}",
                row.status, row.ride_id
            ))
        })?;
        Ok(Self {
            seq: row.seq,
            ride_id: RideId::from_uuid(row.ride_id),
            status,
            created_at: row.created_at,
        })
    }
}

/// A row of the `chairs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChairRow {
    /// Chair id.
    pub id: Uuid,
    /// Owner id.
    pub owner_id: Uuid,
    /// Display name.
    pub name: String,
    /// Model name.
    pub model: String,
    /// Active flag.
    pub is_active: bool,
    /// Access token.
    pub access_token: String,
}

impl From<ChairRow> for Chair {
    fn from(row: ChairRow) -> Self {
        Self {
            id: ChairId::from_uuid(row.id),
            owner_id: OwnerId::from_uuid(row.owner_id),
            name: row.name,
            model: row.model,
            is_active: row.is_active,
            access_token: row.access_token,
        }
    }
}

/// A row of the `chair_locations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChairLocationRow {
    /// Chair id.
    pub chair_id: Uuid,
    /// Last latitude.
    pub latitude: i32,
    /// Last longitude.
    pub longitude: i32,
    /// Odometer.
    pub total_distance: i64,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<ChairLocationRow> for ChairLocation {
    fn from(row: ChairLocationRow) -> Self {
        Self {
            chair_id: ChairId::from_uuid(row.chair_id),
            position: Coordinate::new(row.latitude, row.longitude),
            total_distance: row.total_distance,
            updated_at: row.updated_at,
        }
    }
}

/// Joined chair / model / location row used to build dispatch candidates.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
    /// Chair id.
    pub id: Uuid,
    /// Model speed.
    pub speed: i32,
    /// Last latitude.
    pub latitude: i32,
    /// Last longitude.
    pub longitude: i32,
}

impl From<CandidateRow> for ChairCandidate {
    fn from(row: CandidateRow) -> Self {
        Self {
            chair_id: ChairId::from_uuid(row.id),
            speed: row.speed,
            position: Coordinate::new(row.latitude, row.longitude),
        }
    }
}
