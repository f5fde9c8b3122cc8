//! Store seeding helpers shared by the service tests.

use crate::domain::{
    Chair, ChairId, Coordinate, OwnerId, Ride, RideStatus, UserId,
};
use crate::persistence::MemoryStore;

pub(crate) const MODEL: &str = "test-model";

/// Registers an active chair of the given speed, optionally with a known
/// position.
pub(crate) async fn chair(store: &MemoryStore, speed: i32, position: Option<Coordinate>) -> Chair {
    let model = format!("{MODEL}-{speed}");
    store.add_chair_model(&model, speed).await;
    let chair = Chair {
        id: ChairId::new(),
        owner_id: OwnerId::new(),
        name: "chair".to_string(),
        model,
        is_active: true,
        access_token: format!("chair-token-{}", uuid::Uuid::new_v4()),
    };
    store.add_chair(chair.clone()).await;
    if let Some(position) = position {
        seed_position(store, chair.id, position).await;
    }
    chair
}

/// Records a first position report for a chair.
pub(crate) async fn seed_position(store: &MemoryStore, chair_id: ChairId, position: Coordinate) {
    use crate::persistence::Store;
    if let Ok(mut tx) = store.begin().await {
        let _ = tx.advance_chair_location(chair_id, position).await;
        let _ = tx.commit().await;
    }
}

/// Inserts an unmatched ride in `MATCHING`.
pub(crate) async fn waiting_ride(
    store: &MemoryStore,
    pickup: Coordinate,
    destination: Coordinate,
) -> Ride {
    let ride = Ride::new(UserId::new(), pickup, destination);
    store.insert_ride_raw(ride.clone()).await;
    store.append_status_raw(ride.id, RideStatus::Matching).await;
    ride
}

/// Inserts a ride assigned to a fresh, held chair whose history walks the
/// happy path up to `status` (or jumps to `CANCELED`).
pub(crate) async fn assigned_ride(store: &MemoryStore, status: RideStatus) -> (Ride, ChairId) {
    let chair = chair(store, 1, Some(Coordinate::new(0, 0))).await;
    let mut ride = Ride::new(UserId::new(), Coordinate::new(2, 0), Coordinate::new(5, 0));
    ride.chair_id = Some(chair.id);
    store.insert_ride_raw(ride.clone()).await;
    store.set_chair_available_raw(chair.id, false).await;

    let mut current = RideStatus::Matching;
    store.append_status_raw(ride.id, current).await;
    if status == RideStatus::Canceled {
        store.append_status_raw(ride.id, status).await;
        return (ride, chair.id);
    }
    while current != status {
        let Some(next) = current.successor() else {
            break;
        };
        store.append_status_raw(ride.id, next).await;
        current = next;
    }
    (ride, chair.id)
}
