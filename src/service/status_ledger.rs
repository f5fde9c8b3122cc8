//! The status ledger: append-only history of ride statuses.
//!
//! A ride's current status is the event with the highest sequence number.
//! Every append goes through [`append`], which enforces the lifecycle and
//! releases the assigned chair when the ride reaches a terminal status.
//! Both functions operate inside the caller's unit of work.

use crate::domain::{Ride, RideId, RideStatus, StatusEvent};
use crate::error::ServiceError;
use crate::persistence::StoreTx;

/// Current status of a ride.
///
/// # Errors
///
/// Returns [`ServiceError::InternalInconsistency`] when the ride has no
/// status event at all, or [`ServiceError::Persistence`] on store failure.
pub async fn current_status(
    tx: &mut dyn StoreTx,
    ride_id: RideId,
) -> Result<RideStatus, ServiceError> {
    tx.latest_status(ride_id)
        .await?
        .map(|event| event.status)
        .ok_or_else(|| {
            ServiceError::InternalInconsistency(format!("ride {ride_id} has no status history"))
        })
}

/// Appends `next` to the ride's history.
///
/// `MATCHING` is only accepted as the first event. Afterwards only the
/// happy-path successor or `CANCELED` (from a non-terminal status) is
/// accepted. Reaching `COMPLETED` or `CANCELED` marks the assigned chair
/// available again in the same unit of work.
///
/// # Errors
///
/// Returns [`ServiceError::Conflict`] for a transition the lifecycle does
/// not allow, [`ServiceError::InternalInconsistency`] when a non-initial
/// status is appended to a ride without history, or
/// [`ServiceError::Persistence`] on store failure.
pub async fn append(
    tx: &mut dyn StoreTx,
    ride: &Ride,
    next: RideStatus,
) -> Result<StatusEvent, ServiceError> {
    match tx.latest_status(ride.id).await? {
        None if next == RideStatus::Matching => {}
        None => {
            return Err(ServiceError::InternalInconsistency(format!(
                "ride {} has no status history",
                ride.id
            )));
        }
        Some(current) if current.status.can_transition_to(next) => {}
        Some(current) => {
            return Err(ServiceError::Conflict(format!(
                "ride {} cannot move from {} to {next}",
                ride.id, current.status
            )));
        }
    }

    let event = tx.append_status(ride.id, next).await?;

    if next.is_terminal() {
        if let Some(chair_id) = ride.chair_id {
            tx.set_chair_available(chair_id, true).await?;
            tracing::debug!(ride_id = %ride.id, %chair_id, "chair released");
        }
    }

    tracing::info!(ride_id = %ride.id, status = %next, seq = event.seq, "ride status appended");
    Ok(event)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, UserId};
    use crate::persistence::{MemoryStore, Store};
    use crate::service::fixtures;

    #[tokio::test]
    async fn first_event_must_be_matching() {
        let store = MemoryStore::new();
        let ride = Ride::new(UserId::new(), Coordinate::new(0, 0), Coordinate::new(1, 0));
        store.insert_ride_raw(ride.clone()).await;

        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let result = append(tx.as_mut(), &ride, RideStatus::Enroute).await;
        assert!(matches!(result, Err(ServiceError::InternalInconsistency(_))));

        let Ok(event) = append(tx.as_mut(), &ride, RideStatus::Matching).await else {
            panic!("initial append failed");
        };
        assert_eq!(event.status, RideStatus::Matching);
        assert!(matches!(
            current_status(tx.as_mut(), ride.id).await,
            Ok(RideStatus::Matching)
        ));
    }

    #[tokio::test]
    async fn skipping_a_step_is_a_conflict() {
        let store = MemoryStore::new();
        let (ride, _) = fixtures::assigned_ride(&store, RideStatus::Matching).await;

        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let result = append(tx.as_mut(), &ride, RideStatus::Pickup).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn sequence_numbers_increase_along_the_lifecycle() {
        let store = MemoryStore::new();
        let (ride, _) = fixtures::assigned_ride(&store, RideStatus::Matching).await;

        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let mut last_seq = 0;
        for status in [
            RideStatus::Enroute,
            RideStatus::Pickup,
            RideStatus::Carrying,
            RideStatus::Arrived,
        ] {
            let Ok(event) = append(tx.as_mut(), &ride, status).await else {
                panic!("append {status} failed");
            };
            assert!(event.seq > last_seq);
            last_seq = event.seq;
        }
        tokio_test::assert_ok!(tx.commit().await);

        let history = store.status_history(ride.id).await;
        let statuses: Vec<_> = history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                RideStatus::Matching,
                RideStatus::Enroute,
                RideStatus::Pickup,
                RideStatus::Carrying,
                RideStatus::Arrived,
            ]
        );
    }

    #[tokio::test]
    async fn terminal_status_releases_the_chair() {
        let store = MemoryStore::new();
        let (ride, chair_id) = fixtures::assigned_ride(&store, RideStatus::Arrived).await;
        assert!(!store.is_chair_available(chair_id).await);

        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        tokio_test::assert_ok!(append(tx.as_mut(), &ride, RideStatus::Completed).await);
        tokio_test::assert_ok!(tx.commit().await);

        assert!(store.is_chair_available(chair_id).await);
    }

    #[tokio::test]
    async fn nothing_follows_a_terminal_status() {
        let store = MemoryStore::new();
        let (ride, _) = fixtures::assigned_ride(&store, RideStatus::Canceled).await;

        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        for next in [RideStatus::Canceled, RideStatus::Enroute, RideStatus::Completed] {
            let result = append(tx.as_mut(), &ride, next).await;
            assert!(matches!(result, Err(ServiceError::Conflict(_))), "{next}");
        }
    }

    #[tokio::test]
    async fn missing_history_is_an_inconsistency() {
        let store = MemoryStore::new();
        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let result = current_status(tx.as_mut(), RideId::new()).await;
        assert!(matches!(result, Err(ServiceError::InternalInconsistency(_))));
    }
}
