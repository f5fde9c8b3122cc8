//! Rides, their lifecycle statuses, and the status events that record
//! every transition.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ChairId, Coordinate, RideId, UserId};
use crate::error::ServiceError;

/// Lifecycle status of a ride.
///
/// The happy path is strictly ordered:
/// `MATCHING → ENROUTE → PICKUP → CARRYING → ARRIVED → COMPLETED`.
/// `CANCELED` may follow any non-terminal status. `COMPLETED` and
/// `CANCELED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    /// Waiting for the dispatch engine to assign a chair.
    Matching,
    /// A chair accepted the assignment and is heading to the pickup point.
    Enroute,
    /// The chair reached the pickup point.
    Pickup,
    /// The rider is on board.
    Carrying,
    /// The chair reached the destination; waiting for evaluation.
    Arrived,
    /// Evaluation submitted and payment settled.
    Completed,
    /// Abandoned before completion.
    Canceled,
}

impl RideStatus {
    /// Returns the status as stored in the ledger.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Matching => "MATCHING",
            Self::Enroute => "ENROUTE",
            Self::Pickup => "PICKUP",
            Self::Carrying => "CARRYING",
            Self::Arrived => "ARRIVED",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Returns `true` for `COMPLETED` and `CANCELED`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Next status on the happy path, if any.
    #[must_use]
    pub const fn successor(&self) -> Option<Self> {
        match self {
            Self::Matching => Some(Self::Enroute),
            Self::Enroute => Some(Self::Pickup),
            Self::Pickup => Some(Self::Carrying),
            Self::Carrying => Some(Self::Arrived),
            Self::Arrived => Some(Self::Completed),
            Self::Completed | Self::Canceled => None,
        }
    }

    /// Whether `next` may be appended after `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        if next == Self::Canceled {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MATCHING" => Ok(Self::Matching),
            "ENROUTE" => Ok(Self::Enroute),
            "PICKUP" => Ok(Self::Pickup),
            "CARRYING" => Ok(Self::Carrying),
            "ARRIVED" => Ok(Self::Arrived),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(ServiceError::Validation(format!(
                "unknown ride status: {other}"
            ))),
        }
    }
}

/// A ride request owned by the user who created it.
///
/// `chair_id` is written exclusively by the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ride {
    /// Ride identifier.
    pub id: RideId,
    /// Requesting user.
    pub user_id: UserId,
    /// Assigned chair, `None` until matched.
    pub chair_id: Option<ChairId>,
    /// Where the rider is picked up.
    pub pickup: Coordinate,
    /// Where the rider is dropped off.
    pub destination: Coordinate,
    /// Rider evaluation (1–5), set on completion.
    pub evaluation: Option<i32>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    /// Builds a fresh, unmatched ride.
    #[must_use]
    pub fn new(user_id: UserId, pickup: Coordinate, destination: Coordinate) -> Self {
        let now = Utc::now();
        Self {
            id: RideId::new(),
            user_id,
            chair_id: None,
            pickup,
            destination,
            evaluation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Manhattan distance between pickup and destination, as measured by
    /// [`Coordinate::distance_to`].
    #[must_use]
    pub fn trip_distance(&self) -> i64 {
        self.pickup.distance_to(&self.destination)
    }
}

/// Immutable ledger entry marking a lifecycle transition.
///
/// `seq` is a store-assigned, strictly increasing sequence; the current
/// status of a ride is the event with the highest `seq`. `created_at` is
/// informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    /// Monotonic sequence number.
    pub seq: i64,
    /// Ride the event belongs to.
    pub ride_id: RideId,
    /// Status entered.
    pub status: RideStatus,
    /// Wall-clock time of the append.
    pub created_at: DateTime<Utc>,
}

/// A validated rider evaluation in `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation(i32);

impl Evaluation {
    /// Lowest accepted score.
    pub const MIN: i64 = 1;
    /// Highest accepted score.
    pub const MAX: i64 = 5;

    /// Validates a raw score.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when `raw` is outside `[1, 5]`.
    pub fn new(raw: i64) -> Result<Self, ServiceError> {
        if !(Self::MIN..=Self::MAX).contains(&raw) {
            return Err(ServiceError::Validation(
                "evaluation must be between 1 and 5".to_string(),
            ));
        }
        i32::try_from(raw)
            .map(Self)
            .map_err(|_| ServiceError::Validation("evaluation out of range".to_string()))
    }

    /// Returns the score.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const ALL: [RideStatus; 7] = [
        RideStatus::Matching,
        RideStatus::Enroute,
        RideStatus::Pickup,
        RideStatus::Carrying,
        RideStatus::Arrived,
        RideStatus::Completed,
        RideStatus::Canceled,
    ];

    #[test]
    fn happy_path_is_a_chain() {
        let mut status = RideStatus::Matching;
        let mut visited = vec![status];
        while let Some(next) = status.successor() {
            assert!(status.can_transition_to(next));
            status = next;
            visited.push(status);
        }
        assert_eq!(status, RideStatus::Completed);
        assert_eq!(visited.len(), 6);
    }

    #[test]
    fn skipping_or_going_back_is_rejected() {
        assert!(!RideStatus::Matching.can_transition_to(RideStatus::Pickup));
        assert!(!RideStatus::Carrying.can_transition_to(RideStatus::Enroute));
        assert!(!RideStatus::Arrived.can_transition_to(RideStatus::Arrived));
    }

    #[test]
    fn cancel_only_from_non_terminal() {
        for status in ALL {
            assert_eq!(
                status.can_transition_to(RideStatus::Canceled),
                !status.is_terminal(),
                "{status}"
            );
        }
    }

    #[test]
    fn terminal_statuses_have_no_successor() {
        assert_eq!(RideStatus::Completed.successor(), None);
        assert_eq!(RideStatus::Canceled.successor(), None);
        assert!(!RideStatus::Completed.can_transition_to(RideStatus::Matching));
    }

    #[test]
    fn parses_what_it_prints() {
        for status in ALL {
            let Ok(parsed) = status.as_str().parse::<RideStatus>() else {
                panic!("failed to parse {status}");
            };
            assert_eq!(parsed, status);
        }
        assert!("DRIVING".parse::<RideStatus>().is_err());
    }

    #[test]
    fn serde_uses_ledger_spelling() {
        let Ok(json) = serde_json::to_string(&RideStatus::Enroute) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"ENROUTE\"");
    }

    #[test]
    fn trip_distance_uses_manhattan_metric() {
        let ride = Ride::new(UserId::new(), Coordinate::new(0, 0), Coordinate::new(-2, 8));
        assert_eq!(ride.trip_distance(), 10);
        assert!(ride.chair_id.is_none());
    }

    #[test]
    fn evaluation_bounds() {
        assert!(Evaluation::new(0).is_err());
        assert!(Evaluation::new(6).is_err());
        assert!(Evaluation::new(-3).is_err());
        for raw in 1..=5 {
            let Ok(evaluation) = Evaluation::new(raw) else {
                panic!("{raw} should be accepted");
            };
            assert_eq!(i64::from(evaluation.get()), raw);
        }
    }
}
