//! Persistence layer: the relational store every component shares.
//!
//! The core never holds authoritative state between calls. It talks to
//! the store through two ports:
//!
//! - [`Store`]: short, self-contained operations (dispatch reads, the
//!   atomic conditional assignment, token lookups) and [`Store::begin`].
//! - [`StoreTx`]: a unit of work. Everything done through one `StoreTx`
//!   commits or rolls back together; dropping it without calling
//!   [`StoreTx::commit`] rolls it back.
//!
//! [`postgres::PostgresStore`] is the production adapter;
//! [`memory::MemoryStore`] is an in-process fixture for tests and local
//! development.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    Chair, ChairCandidate, ChairId, ChairLocation, Coordinate, Evaluation, Ride, RideId,
    RideStatus, StatusEvent, UserId,
};
use crate::error::ServiceError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Result of an atomic conditional assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The ride now points at the chair and the chair is held.
    Assigned,
    /// The ride was matched or canceled by someone else first.
    RideTaken,
    /// The chair became inactive or was claimed by another ride.
    ChairUnavailable,
}

/// Store operations that do not need a caller-controlled transaction.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Opens a unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the store is unreachable.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, ServiceError>;

    /// Rides with no chair that are still waiting for one, oldest first,
    /// at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn unmatched_rides(&self, limit: usize) -> Result<Vec<Ride>, ServiceError>;

    /// Active, available chairs with a known position and positive speed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn dispatch_candidates(&self) -> Result<Vec<ChairCandidate>, ServiceError>;

    /// Assigns `chair_id` to `ride_id` iff the ride is still unmatched and
    /// not canceled AND the chair is still active and available. On
    /// success the chair is marked unavailable in the same atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure. A lost race
    /// is not an error; it is reported through [`AssignOutcome`].
    async fn assign_chair(
        &self,
        ride_id: RideId,
        chair_id: ChairId,
    ) -> Result<AssignOutcome, ServiceError>;

    /// Chair owning the given access token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn chair_by_token(&self, token: &str) -> Result<Option<Chair>, ServiceError>;

    /// User owning the given access token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn user_by_token(&self, token: &str) -> Result<Option<UserId>, ServiceError>;
}

/// A transactional unit of work against the store.
///
/// Reads that precede a write on the same ride lock that ride for the
/// remainder of the transaction.
#[async_trait]
pub trait StoreTx: Send {
    /// Loads and locks a ride.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn ride_for_update(&mut self, ride_id: RideId) -> Result<Option<Ride>, ServiceError>;

    /// Inserts a new ride.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn insert_ride(&mut self, ride: &Ride) -> Result<(), ServiceError>;

    /// Loads and locks the most recently updated ride assigned to a chair.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn latest_ride_for_chair(
        &mut self,
        chair_id: ChairId,
    ) -> Result<Option<Ride>, ServiceError>;

    /// Whether the user has a ride whose current status is not terminal.
    ///
    /// Serializes with other checks for the same user until the unit of
    /// work ends, so a check followed by an insert cannot race.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn has_active_ride(&mut self, user_id: UserId) -> Result<bool, ServiceError>;

    /// Writes the evaluation and returns the updated ride.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the ride does not exist, or
    /// [`ServiceError::Persistence`] on store failure.
    async fn set_evaluation(
        &mut self,
        ride_id: RideId,
        evaluation: Evaluation,
    ) -> Result<Ride, ServiceError>;

    /// Atomically moves a chair to `position`, adding the Manhattan
    /// distance from its previous position to the odometer. The first
    /// report for a chair starts the odometer at zero.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn advance_chair_location(
        &mut self,
        chair_id: ChairId,
        position: Coordinate,
    ) -> Result<ChairLocation, ServiceError>;

    /// Status event with the highest sequence for a ride.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn latest_status(&mut self, ride_id: RideId)
    -> Result<Option<StatusEvent>, ServiceError>;

    /// Appends a status event; the store assigns the sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn append_status(
        &mut self,
        ride_id: RideId,
        status: RideStatus,
    ) -> Result<StatusEvent, ServiceError>;

    /// Sets the chair availability flag.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn set_chair_available(
        &mut self,
        chair_id: ChairId,
        available: bool,
    ) -> Result<(), ServiceError>;

    /// Payment gateway credential registered for a user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on store failure.
    async fn payment_token(&mut self, user_id: UserId) -> Result<Option<String>, ServiceError>;

    /// Makes every write of this unit of work durable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the commit fails; the
    /// writes are then discarded.
    async fn commit(self: Box<Self>) -> Result<(), ServiceError>;

    /// Discards every write of this unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the store reports a
    /// failure while rolling back.
    async fn rollback(self: Box<Self>) -> Result<(), ServiceError>;
}
