//! Chairs, their odometer records, and the dispatch view of a chair.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ChairId, Coordinate, OwnerId};

/// A registered chair.
///
/// The model name resolves to a fixed speed through the chair model
/// table; the access token identifies the chair on its own API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chair {
    /// Chair identifier.
    pub id: ChairId,
    /// Owning operator.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Model name (key into the speed table).
    pub model: String,
    /// Whether the chair is accepting work.
    pub is_active: bool,
    /// Bearer token the chair authenticates with.
    pub access_token: String,
}

/// Last known position and cumulative distance of a chair.
///
/// One record per chair. `total_distance` never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChairLocation {
    /// Chair the record belongs to.
    pub chair_id: ChairId,
    /// Last reported position.
    pub position: Coordinate,
    /// Odometer: sum of Manhattan distances between consecutive reports.
    pub total_distance: i64,
    /// When the record was last written (sub-second precision).
    pub updated_at: DateTime<Utc>,
}

impl ChairLocation {
    /// Record for a chair's first report: zero distance travelled.
    #[must_use]
    pub const fn first(chair_id: ChairId, position: Coordinate, at: DateTime<Utc>) -> Self {
        Self {
            chair_id,
            position,
            total_distance: 0,
            updated_at: at,
        }
    }

    /// Record after moving to `position`, accumulating the distance from
    /// the previous position.
    #[must_use]
    pub fn advance(&self, position: Coordinate, at: DateTime<Utc>) -> Self {
        Self {
            chair_id: self.chair_id,
            position,
            total_distance: self
                .total_distance
                .saturating_add(self.position.distance_to(&position)),
            updated_at: at,
        }
    }
}

/// A chair eligible for assignment, as seen by one dispatch cycle.
///
/// Only active, available chairs with a known position and a positive
/// model speed are ever turned into candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChairCandidate {
    /// Chair identifier.
    pub chair_id: ChairId,
    /// Distance units per time unit for the chair's model.
    pub speed: i32,
    /// Last known position.
    pub position: Coordinate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_report_starts_odometer_at_zero() {
        let record = ChairLocation::first(ChairId::new(), Coordinate::new(5, 5), Utc::now());
        assert_eq!(record.total_distance, 0);
    }

    #[test]
    fn advance_accumulates_manhattan_distance() {
        let start = ChairLocation::first(ChairId::new(), Coordinate::new(0, 0), Utc::now());
        let moved = start.advance(Coordinate::new(3, 4), Utc::now());
        let back = moved.advance(Coordinate::new(0, 0), Utc::now());
        assert_eq!(moved.total_distance, 7);
        assert_eq!(back.total_distance, 14);
        assert_eq!(back.chair_id, start.chair_id);
    }

    #[test]
    fn standing_still_keeps_distance() {
        let start = ChairLocation::first(ChairId::new(), Coordinate::new(9, -9), Utc::now());
        let same = start.advance(Coordinate::new(9, -9), Utc::now());
        assert_eq!(same.total_distance, start.total_distance);
    }
}
