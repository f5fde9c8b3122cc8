//! Fare computation.
//!
//! Discount rules (coupons, campaigns) belong to another component; the
//! settlement flow only sees the [`FareCalculator`] seam.

use std::fmt;

use crate::domain::{Coordinate, UserId};

/// Computes the amount charged for a ride.
pub trait FareCalculator: Send + Sync + fmt::Debug {
    /// Amount owed by `user_id` for a trip between the two points, after
    /// any discount the user is entitled to.
    fn discounted_fare(&self, user_id: UserId, pickup: Coordinate, destination: Coordinate) -> i64;
}

/// Flat fee plus a per-distance rate, no discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeteredFare {
    /// Charged for every ride.
    pub initial: i64,
    /// Charged per unit of Manhattan trip distance.
    pub per_distance: i64,
}

impl MeteredFare {
    /// Creates a fare table.
    #[must_use]
    pub const fn new(initial: i64, per_distance: i64) -> Self {
        Self {
            initial,
            per_distance,
        }
    }
}

impl Default for MeteredFare {
    fn default() -> Self {
        Self::new(500, 100)
    }
}

impl FareCalculator for MeteredFare {
    fn discounted_fare(&self, _user_id: UserId, pickup: Coordinate, destination: Coordinate) -> i64 {
        self.per_distance
            .saturating_mul(pickup.distance_to(&destination))
            .saturating_add(self.initial)
    }
}
