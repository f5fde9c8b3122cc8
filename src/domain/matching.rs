//! Pure matching policy used by the dispatch engine.
//!
//! A dispatch cycle orders the unmatched rides by trip distance
//! (longest first) and, for each ride, picks the candidate chair with the
//! lowest estimated time to completion:
//!
//! ```text
//! score = (trip_distance + distance(chair, pickup)) / chair.speed
//! ```
//!
//! Scores are compared exactly by cross-multiplication, so no floating
//! point rounding can reorder two candidates. Ties go to the lowest chair
//! id. Nothing in this module touches the store; the [`CandidatePool`] is
//! a working set owned by a single cycle.

use std::cmp::Ordering;

use super::{ChairCandidate, ChairId, Ride};

/// Estimated time for a chair to finish a ride, kept as an exact ratio.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    distance: i64,
    speed: i64,
}

impl Score {
    /// Builds the score for a ride of `trip_distance` served by a chair
    /// `pickup_distance` away from the pickup point.
    ///
    /// Returns `None` for a non-positive speed.
    #[must_use]
    pub fn new(trip_distance: i64, pickup_distance: i64, speed: i32) -> Option<Self> {
        if speed <= 0 {
            return None;
        }
        Some(Self {
            distance: trip_distance.saturating_add(pickup_distance),
            speed: i64::from(speed),
        })
    }

    /// Approximate value, for logging only.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn approx(&self) -> f64 {
        self.distance as f64 / self.speed as f64
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.distance) * i128::from(other.speed);
        let rhs = i128::from(other.distance) * i128::from(self.speed);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

/// Sorts rides into dispatch order: longest trip first, then oldest
/// request, then id.
///
/// Long trips tie up a chair the longest, so they claim supply before
/// short trips exhaust it.
pub fn sort_for_dispatch(rides: &mut [Ride]) {
    rides.sort_by(|a, b| {
        b.trip_distance()
            .cmp(&a.trip_distance())
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// The set of chairs still assignable within one dispatch cycle.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    chairs: Vec<ChairCandidate>,
}

impl CandidatePool {
    /// Builds a pool, dropping chairs whose speed cannot produce a score.
    #[must_use]
    pub fn new(chairs: Vec<ChairCandidate>) -> Self {
        let chairs = chairs.into_iter().filter(|c| c.speed > 0).collect();
        Self { chairs }
    }

    /// Number of chairs left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chairs.len()
    }

    /// Returns `true` once every chair has been handed out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chairs.is_empty()
    }

    /// Best chair for `ride` together with its score.
    #[must_use]
    pub fn best_for(&self, ride: &Ride) -> Option<(ChairCandidate, Score)> {
        let trip = ride.trip_distance();
        self.chairs
            .iter()
            .filter_map(|chair| {
                Score::new(trip, chair.position.distance_to(&ride.pickup), chair.speed)
                    .map(|score| (*chair, score))
            })
            .min_by(|(a, sa), (b, sb)| sa.cmp(sb).then_with(|| a.chair_id.cmp(&b.chair_id)))
    }

    /// Takes a chair out of the pool. Returns it if it was present.
    pub fn remove(&mut self, chair_id: ChairId) -> Option<ChairCandidate> {
        let idx = self.chairs.iter().position(|c| c.chair_id == chair_id)?;
        Some(self.chairs.swap_remove(idx))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::{Coordinate, UserId};

    fn chair(n: u128, speed: i32, lat: i32, lon: i32) -> ChairCandidate {
        ChairCandidate {
            chair_id: ChairId::from_uuid(uuid::Uuid::from_u128(n)),
            speed,
            position: Coordinate::new(lat, lon),
        }
    }

    fn ride(pickup: (i32, i32), destination: (i32, i32)) -> Ride {
        Ride::new(
            UserId::new(),
            Coordinate::new(pickup.0, pickup.1),
            Coordinate::new(destination.0, destination.1),
        )
    }

    #[test]
    fn score_compares_exact_ratios() {
        let (Some(a), Some(b)) = (Score::new(10, 0, 3), Score::new(7, 0, 2)) else {
            panic!("valid scores");
        };
        // 10/3 < 7/2
        assert!(a < b);
        let (Some(c), Some(d)) = (Score::new(4, 0, 2), Score::new(6, 0, 3)) else {
            panic!("valid scores");
        };
        assert_eq!(c, d);
    }

    #[test]
    fn score_rejects_non_positive_speed() {
        assert!(Score::new(1, 1, 0).is_none());
        assert!(Score::new(1, 1, -4).is_none());
    }

    #[test]
    fn longest_trip_is_dispatched_first() {
        let short = ride((0, 0), (1, 2));
        let long = ride((0, 0), (10, 0));
        let medium = ride((5, 5), (0, 5));
        let mut rides = vec![short.clone(), long.clone(), medium.clone()];
        sort_for_dispatch(&mut rides);
        let order: Vec<_> = rides.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![long.id, medium.id, short.id]);
    }

    #[test]
    fn equal_trips_fall_back_to_request_age() {
        let mut newer = ride((0, 0), (3, 0));
        let older = ride((0, 0), (0, 3));
        newer.created_at = older.created_at + Duration::seconds(5);
        let mut rides = vec![newer.clone(), older.clone()];
        sort_for_dispatch(&mut rides);
        assert_eq!(rides.first().map(|r| r.id), Some(older.id));
    }

    #[test]
    fn best_candidate_minimizes_time_to_completion() {
        let r = ride((0, 0), (10, 0));
        // slow but on the spot: (10 + 0) / 1 = 10
        // fast but far away:    (10 + 6) / 2 = 8
        let pool = CandidatePool::new(vec![chair(1, 1, 0, 0), chair(2, 2, 3, 3)]);
        let Some((best, score)) = pool.best_for(&r) else {
            panic!("expected a candidate");
        };
        assert_eq!(best.chair_id, ChairId::from_uuid(uuid::Uuid::from_u128(2)));
        assert!((score.approx() - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_go_to_lowest_chair_id() {
        let r = ride((0, 0), (4, 0));
        let pool = CandidatePool::new(vec![chair(9, 1, 0, 0), chair(3, 2, 4, 0), chair(5, 1, 0, 0)]);
        let Some((best, _)) = pool.best_for(&r) else {
            panic!("expected a candidate");
        };
        // chair 3: (4 + 4) / 2 = 4, chairs 5 and 9: 4 / 1 = 4
        assert_eq!(best.chair_id, ChairId::from_uuid(uuid::Uuid::from_u128(3)));
    }

    #[test]
    fn pool_drops_unusable_chairs_and_supports_removal() {
        let mut pool = CandidatePool::new(vec![chair(1, 0, 0, 0), chair(2, 3, 0, 0)]);
        assert_eq!(pool.len(), 1);
        let id = ChairId::from_uuid(uuid::Uuid::from_u128(2));
        assert!(pool.remove(id).is_some());
        assert!(pool.remove(id).is_none());
        assert!(pool.is_empty());
        assert!(pool.best_for(&ride((0, 0), (1, 1))).is_none());
    }

    #[test]
    fn created_at_is_only_a_tie_breaker() {
        let mut old_short = ride((0, 0), (1, 0));
        old_short.created_at = Utc::now() - Duration::hours(1);
        let young_long = ride((0, 0), (50, 0));
        let mut rides = vec![old_short, young_long.clone()];
        sort_for_dispatch(&mut rides);
        assert_eq!(rides.first().map(|r| r.id), Some(young_long.id));
    }
}
