//! DTOs for the rider-facing endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Coordinate;

/// Request body for `POST /api/app/rides`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRideRequest {
    /// Where the rider waits.
    pub pickup_coordinate: Coordinate,
    /// Where the rider goes.
    pub destination_coordinate: Coordinate,
}

/// Response body for `POST /api/app/rides` (202 Accepted).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRideResponse {
    /// New ride identifier.
    pub ride_id: Uuid,
    /// Fare charged on completion.
    pub fare: i64,
}

/// Request body for `POST /api/app/rides/{ride_id}/evaluation`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvaluationRequest {
    /// Rating from 1 to 5.
    pub evaluation: i64,
}

/// Response body for `POST /api/app/rides/{ride_id}/evaluation`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EvaluationResponse {
    /// Amount charged.
    pub fare: i64,
    /// When the ride was completed (unix millis).
    pub completed_at: i64,
}
