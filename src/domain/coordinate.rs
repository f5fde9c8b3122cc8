//! Integer grid coordinates and the distance metric shared by dispatch,
//! the chair odometer, and fare computation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A point on the service grid.
///
/// Coordinates are integers; equality is exact, which is what the
/// lifecycle transitions rely on when a chair reports it has reached a
/// pickup or destination point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    /// Latitude component.
    pub latitude: i32,
    /// Longitude component.
    pub longitude: i32,
}

impl Coordinate {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(latitude: i32, longitude: i32) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Manhattan distance `|Δlat| + |Δlon|` to `other`.
    ///
    /// This is the only metric used in the crate: trip distance, pickup
    /// distance, odometer increments, and fares all go through it.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> i64 {
        let dlat = i64::from(self.latitude) - i64::from(other.latitude);
        let dlon = i64::from(self.longitude) - i64::from(other.longitude);
        dlat.abs() + dlon.abs()
    }
}
