//! Chair position reports and the odometer.
//!
//! A report moves the chair, adds the Manhattan distance travelled to its
//! odometer, and advances the chair's current ride when the new position
//! is the point the ride was heading to:
//!
//! | Current status | Position reached | Appended  |
//! |----------------|------------------|-----------|
//! | `ENROUTE`      | pickup           | `PICKUP`  |
//! | `CARRYING`     | destination      | `ARRIVED` |
//!
//! Everything happens in one unit of work.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::status_ledger;
use crate::domain::{ChairId, Coordinate, Ride, RideStatus};
use crate::error::ServiceError;
use crate::persistence::{Store, StoreTx};

/// Result of one accepted position report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationReport {
    /// When the position was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Odometer after this report.
    pub total_distance: i64,
    /// Status appended to the chair's current ride, if any.
    pub transition: Option<RideStatus>,
}

/// Records chair positions.
#[derive(Debug)]
pub struct LocationService {
    store: Arc<dyn Store>,
}

impl LocationService {
    /// Creates the service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Records that `chair_id` is now at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InternalInconsistency`] when the chair's
    /// current ride has no status history, or
    /// [`ServiceError::Persistence`] on store failure. Nothing is
    /// recorded in either case.
    pub async fn report_coordinate(
        &self,
        chair_id: ChairId,
        position: Coordinate,
    ) -> Result<LocationReport, ServiceError> {
        let mut tx = self.store.begin().await?;

        let location = tx.advance_chair_location(chair_id, position).await?;
        let transition = match tx.latest_ride_for_chair(chair_id).await? {
            Some(ride) => advance_ride(tx.as_mut(), &ride, position).await?,
            None => None,
        };

        tx.commit().await?;

        tracing::debug!(
            %chair_id,
            latitude = position.latitude,
            longitude = position.longitude,
            total_distance = location.total_distance,
            "chair position recorded"
        );
        Ok(LocationReport {
            recorded_at: location.updated_at,
            total_distance: location.total_distance,
            transition,
        })
    }
}

async fn advance_ride(
    tx: &mut dyn StoreTx,
    ride: &Ride,
    position: Coordinate,
) -> Result<Option<RideStatus>, ServiceError> {
    let next = match status_ledger::current_status(tx, ride.id).await? {
        RideStatus::Enroute if position == ride.pickup => Some(RideStatus::Pickup),
        RideStatus::Carrying if position == ride.destination => Some(RideStatus::Arrived),
        _ => None,
    };
    if let Some(next) = next {
        status_ledger::append(tx, ride, next).await?;
    }
    Ok(next)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::payment::MeteredFare;
    use crate::persistence::MemoryStore;
    use crate::service::{DispatchService, RideService, fixtures};

    fn service(store: &MemoryStore) -> LocationService {
        LocationService::new(Arc::new(store.clone()))
    }

    async fn report(service: &LocationService, chair_id: ChairId, at: Coordinate) -> LocationReport {
        match service.report_coordinate(chair_id, at).await {
            Ok(report) => report,
            Err(err) => panic!("report failed: {err}"),
        }
    }

    async fn latest(store: &MemoryStore, ride: &Ride) -> Option<RideStatus> {
        store.status_history(ride.id).await.last().map(|e| e.status)
    }

    #[tokio::test]
    async fn odometer_accumulates_manhattan_distance() {
        let store = MemoryStore::new();
        let chair = fixtures::chair(&store, 1, None).await;
        let locations = service(&store);

        let first = report(&locations, chair.id, Coordinate::new(0, 0)).await;
        assert_eq!(first.total_distance, 0);

        let mut previous = first.total_distance;
        for (at, expected) in [
            (Coordinate::new(3, 4), 7),
            (Coordinate::new(3, 4), 7),
            (Coordinate::new(-2, 4), 12),
            (Coordinate::new(0, 0), 18),
        ] {
            let next = report(&locations, chair.id, at).await;
            assert_eq!(next.total_distance, expected);
            assert!(next.total_distance >= previous);
            previous = next.total_distance;
        }

        let Some(stored) = store.chair_location(chair.id).await else {
            panic!("location missing");
        };
        assert_eq!(stored.position, Coordinate::new(0, 0));
        assert_eq!(stored.total_distance, 18);
    }

    #[tokio::test]
    async fn reaching_pickup_while_enroute_appends_pickup() {
        let store = MemoryStore::new();
        let (ride, chair_id) = fixtures::assigned_ride(&store, RideStatus::Enroute).await;
        let locations = service(&store);

        let away = report(&locations, chair_id, Coordinate::new(1, 0)).await;
        assert_eq!(away.transition, None);

        let there = report(&locations, chair_id, ride.pickup).await;
        assert_eq!(there.transition, Some(RideStatus::Pickup));
        assert_eq!(latest(&store, &ride).await, Some(RideStatus::Pickup));
    }

    #[tokio::test]
    async fn reaching_destination_while_carrying_appends_arrived() {
        let store = MemoryStore::new();
        let (ride, chair_id) = fixtures::assigned_ride(&store, RideStatus::Carrying).await;

        let outcome = report(&service(&store), chair_id, ride.destination).await;

        assert_eq!(outcome.transition, Some(RideStatus::Arrived));
        assert_eq!(latest(&store, &ride).await, Some(RideStatus::Arrived));
    }

    #[tokio::test]
    async fn destination_before_pickup_changes_nothing() {
        let store = MemoryStore::new();
        let (ride, chair_id) = fixtures::assigned_ride(&store, RideStatus::Enroute).await;

        let outcome = report(&service(&store), chair_id, ride.destination).await;

        assert_eq!(outcome.transition, None);
        assert_eq!(latest(&store, &ride).await, Some(RideStatus::Enroute));
    }

    #[tokio::test]
    async fn reports_advance_the_chairs_newest_ride() {
        let store = MemoryStore::new();
        let (old_ride, chair_id) = fixtures::assigned_ride(&store, RideStatus::Arrived).await;
        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        tokio_test::assert_ok!(
            status_ledger::append(tx.as_mut(), &old_ride, RideStatus::Completed).await
        );
        tokio_test::assert_ok!(tx.commit().await);
        assert!(store.is_chair_available(chair_id).await);
        let old_history = store.status_history(old_ride.id).await;

        let locations = service(&store);
        report(&locations, chair_id, old_ride.destination).await;
        let new_ride =
            fixtures::waiting_ride(&store, Coordinate::new(5, 3), Coordinate::new(9, 9)).await;
        let dispatch = DispatchService::new(Arc::new(store.clone()), 10);
        tokio_test::assert_ok!(dispatch.run_cycle().await);
        let Some(assigned) = store.ride(new_ride.id).await else {
            panic!("ride missing");
        };
        assert_eq!(assigned.chair_id, Some(chair_id));
        let Some(chair) = store.chair_by_id(chair_id).await else {
            panic!("chair missing");
        };
        let rides = RideService::new(Arc::new(store.clone()), Arc::new(MeteredFare::default()));
        tokio_test::assert_ok!(
            rides
                .update_ride_status(&chair, new_ride.id, RideStatus::Enroute)
                .await
        );

        // The old ride's pickup must not matter any more.
        let stale = report(&locations, chair_id, old_ride.pickup).await;
        assert_eq!(stale.transition, None);
        let arrived = report(&locations, chair_id, new_ride.pickup).await;

        assert_eq!(arrived.transition, Some(RideStatus::Pickup));
        assert_eq!(latest(&store, &new_ride).await, Some(RideStatus::Pickup));
        assert_eq!(store.status_history(old_ride.id).await, old_history);
    }

    #[tokio::test]
    async fn ride_without_history_rolls_back_the_report() {
        let store = MemoryStore::new();
        let chair = fixtures::chair(&store, 1, Some(Coordinate::new(0, 0))).await;
        let mut ride = Ride::new(UserId::new(), Coordinate::new(1, 0), Coordinate::new(2, 0));
        ride.chair_id = Some(chair.id);
        store.insert_ride_raw(ride).await;

        let result = service(&store)
            .report_coordinate(chair.id, Coordinate::new(5, 5))
            .await;

        assert!(matches!(result, Err(ServiceError::InternalInconsistency(_))));
        let Some(stored) = store.chair_location(chair.id).await else {
            panic!("location missing");
        };
        assert_eq!(stored.position, Coordinate::new(0, 0));
        assert_eq!(stored.total_distance, 0);
    }
}
