//! Ride requests and the status changes chairs and riders report
//! directly.

use std::sync::Arc;

use super::status_ledger;
use crate::domain::{Chair, Coordinate, Ride, RideId, RideStatus, StatusEvent, UserId};
use crate::error::ServiceError;
use crate::payment::FareCalculator;
use crate::persistence::Store;

/// A freshly requested ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideRequested {
    /// The new ride, in `MATCHING`.
    pub ride_id: RideId,
    /// Fare the rider will be charged on completion.
    pub fare: i64,
}

/// Creates rides and applies reported status changes.
#[derive(Debug)]
pub struct RideService {
    store: Arc<dyn Store>,
    fares: Arc<dyn FareCalculator>,
}

impl RideService {
    /// Creates the service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, fares: Arc<dyn FareCalculator>) -> Self {
        Self { store, fares }
    }

    /// Opens a ride for `user_id` and queues it for dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] when the user already has a ride
    /// in progress, or [`ServiceError::Persistence`] on store failure.
    pub async fn request_ride(
        &self,
        user_id: UserId,
        pickup: Coordinate,
        destination: Coordinate,
    ) -> Result<RideRequested, ServiceError> {
        let mut tx = self.store.begin().await?;
        if tx.has_active_ride(user_id).await? {
            return Err(ServiceError::Conflict(format!(
                "user {user_id} already has a ride in progress"
            )));
        }

        let ride = Ride::new(user_id, pickup, destination);
        tx.insert_ride(&ride).await?;
        status_ledger::append(tx.as_mut(), &ride, RideStatus::Matching).await?;
        tx.commit().await?;

        let fare = self.fares.discounted_fare(user_id, pickup, destination);
        tracing::info!(ride_id = %ride.id, %user_id, fare, "ride requested");
        Ok(RideRequested {
            ride_id: ride.id,
            fare,
        })
    }

    /// Applies a status reported by the chair serving the ride.
    ///
    /// A chair may only accept its assignment (`ENROUTE`) or confirm the
    /// rider boarded (`CARRYING`); every other status is derived by the
    /// system.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`]: `status` is not one a chair may
    ///   report.
    /// - [`ServiceError::NotFound`]: the ride does not exist or is not
    ///   assigned to `chair`.
    /// - [`ServiceError::Conflict`]: the ride is not in the status that
    ///   precedes `status`.
    /// - [`ServiceError::Persistence`]: store failure.
    pub async fn update_ride_status(
        &self,
        chair: &Chair,
        ride_id: RideId,
        status: RideStatus,
    ) -> Result<StatusEvent, ServiceError> {
        if !matches!(status, RideStatus::Enroute | RideStatus::Carrying) {
            return Err(ServiceError::Validation(format!(
                "chairs cannot report status {status}"
            )));
        }

        let mut tx = self.store.begin().await?;
        let ride = tx
            .ride_for_update(ride_id)
            .await?
            .filter(|ride| ride.chair_id == Some(chair.id))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("ride {ride_id} is not assigned to this chair"))
            })?;

        let event = status_ledger::append(tx.as_mut(), &ride, status).await?;
        tx.commit().await?;
        Ok(event)
    }

    /// Cancels a ride that has not reached a terminal status. The assigned
    /// chair, if any, becomes available again.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the ride does not exist or
    /// belongs to another user, [`ServiceError::Conflict`] when it already
    /// finished, or [`ServiceError::Persistence`] on store failure.
    pub async fn cancel_ride(
        &self,
        user_id: UserId,
        ride_id: RideId,
    ) -> Result<StatusEvent, ServiceError> {
        let mut tx = self.store.begin().await?;
        let ride = tx
            .ride_for_update(ride_id)
            .await?
            .filter(|ride| ride.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("ride {ride_id} not found")))?;

        let event = status_ledger::append(tx.as_mut(), &ride, RideStatus::Canceled).await?;
        tx.commit().await?;
        Ok(event)
    }
}
