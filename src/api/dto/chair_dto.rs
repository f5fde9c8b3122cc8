//! DTOs for the chair-facing endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::RideStatus;

/// Response body for `POST /api/chair/coordinate`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CoordinateResponse {
    /// When the position was recorded (unix millis).
    pub recorded_at: i64,
}

/// Request body for `POST /api/chair/rides/{ride_id}/status`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RideStatusRequest {
    /// `ENROUTE` to accept the assignment, `CARRYING` once the rider is
    /// on board.
    pub status: RideStatus,
}
