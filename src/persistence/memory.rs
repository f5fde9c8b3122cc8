//! In-process store used by tests and local development.
//!
//! All state lives behind one [`tokio::sync::Mutex`]. A transaction holds
//! the lock for its whole lifetime together with a snapshot taken at
//! `begin`; rolling back (or dropping the transaction) restores the
//! snapshot. Transactions are therefore fully serialized, which is a
//! stronger guarantee than the PostgreSQL adapter gives and is enough to
//! exercise every code path of the services.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{AssignOutcome, Store, StoreTx};
use crate::domain::{
    Chair, ChairCandidate, ChairId, ChairLocation, Coordinate, Evaluation, Ride, RideId,
    RideStatus, StatusEvent, UserId,
};
use crate::error::ServiceError;

#[derive(Debug, Clone)]
struct StoredRide {
    ride: Ride,
    /// Bumped on every write; orders rides whose timestamps collide.
    touched: u64,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    rides: HashMap<RideId, StoredRide>,
    statuses: Vec<StatusEvent>,
    next_seq: i64,
    touch_counter: u64,
    chairs: HashMap<ChairId, Chair>,
    chair_models: HashMap<String, i32>,
    locations: HashMap<ChairId, ChairLocation>,
    availability: HashMap<ChairId, bool>,
    users: HashMap<String, UserId>,
    payment_tokens: HashMap<UserId, String>,
}

impl MemoryState {
    fn touch(&mut self) -> u64 {
        self.touch_counter += 1;
        self.touch_counter
    }

    fn latest_status(&self, ride_id: RideId) -> Option<&StatusEvent> {
        self.statuses
            .iter()
            .filter(|e| e.ride_id == ride_id)
            .max_by_key(|e| e.seq)
    }

    fn is_canceled(&self, ride_id: RideId) -> bool {
        self.statuses
            .iter()
            .any(|e| e.ride_id == ride_id && e.status == RideStatus::Canceled)
    }

    fn is_available(&self, chair_id: ChairId) -> bool {
        self.availability.get(&chair_id).copied().unwrap_or(true)
    }
}

/// Mutex-guarded in-memory [`Store`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while offline every operation fails with
    /// [`ServiceError::Persistence`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), ServiceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ServiceError::Persistence("store is offline".to_string()));
        }
        Ok(())
    }

    /// Registers a chair model and its speed.
    pub async fn add_chair_model(&self, name: &str, speed: i32) {
        self.state
            .lock()
            .await
            .chair_models
            .insert(name.to_string(), speed);
    }

    /// Registers a chair.
    pub async fn add_chair(&self, chair: Chair) {
        self.state.lock().await.chairs.insert(chair.id, chair);
    }

    /// Current copy of a chair.
    pub async fn chair_by_id(&self, chair_id: ChairId) -> Option<Chair> {
        self.state.lock().await.chairs.get(&chair_id).cloned()
    }

    /// Activates or deactivates a chair.
    pub async fn set_chair_active(&self, chair_id: ChairId, active: bool) {
        if let Some(chair) = self.state.lock().await.chairs.get_mut(&chair_id) {
            chair.is_active = active;
        }
    }

    /// Registers a user and the bearer token it authenticates with.
    pub async fn add_user(&self, user_id: UserId, access_token: &str) {
        self.state
            .lock()
            .await
            .users
            .insert(access_token.to_string(), user_id);
    }

    /// Registers a payment gateway credential for a user.
    pub async fn add_payment_token(&self, user_id: UserId, token: &str) {
        self.state
            .lock()
            .await
            .payment_tokens
            .insert(user_id, token.to_string());
    }

    /// Inserts a ride directly, bypassing the lifecycle.
    pub async fn insert_ride_raw(&self, ride: Ride) {
        let mut state = self.state.lock().await;
        let touched = state.touch();
        state.rides.insert(ride.id, StoredRide { ride, touched });
    }

    /// Appends a status event directly, bypassing transition checks.
    pub async fn append_status_raw(&self, ride_id: RideId, status: RideStatus) -> StatusEvent {
        let mut state = self.state.lock().await;
        push_status(&mut state, ride_id, status)
    }

    /// Current copy of a ride.
    pub async fn ride(&self, ride_id: RideId) -> Option<Ride> {
        self.state
            .lock()
            .await
            .rides
            .get(&ride_id)
            .map(|s| s.ride.clone())
    }

    /// All status events of a ride, in sequence order.
    pub async fn status_history(&self, ride_id: RideId) -> Vec<StatusEvent> {
        let state = self.state.lock().await;
        let mut events: Vec<_> = state
            .statuses
            .iter()
            .filter(|e| e.ride_id == ride_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.seq);
        events
    }

    /// Current odometer record of a chair.
    pub async fn chair_location(&self, chair_id: ChairId) -> Option<ChairLocation> {
        self.state.lock().await.locations.get(&chair_id).cloned()
    }

    /// Sets the availability flag of a chair directly.
    pub async fn set_chair_available_raw(&self, chair_id: ChairId, available: bool) {
        self.state
            .lock()
            .await
            .availability
            .insert(chair_id, available);
    }

    /// Availability flag of a chair (`true` when never assigned).
    pub async fn is_chair_available(&self, chair_id: ChairId) -> bool {
        self.state.lock().await.is_available(chair_id)
    }
}

fn push_status(state: &mut MemoryState, ride_id: RideId, status: RideStatus) -> StatusEvent {
    state.next_seq += 1;
    let event = StatusEvent {
        seq: state.next_seq,
        ride_id,
        status,
        created_at: Utc::now(),
    };
    state.statuses.push(event.clone());
    event
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, ServiceError> {
        self.check_online()?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }

    async fn unmatched_rides(&self, limit: usize) -> Result<Vec<Ride>, ServiceError> {
        self.check_online()?;
        let state = self.state.lock().await;
        let mut rides: Vec<Ride> = state
            .rides
            .values()
            .filter(|s| s.ride.chair_id.is_none() && !state.is_canceled(s.ride.id))
            .map(|s| s.ride.clone())
            .collect();
        rides.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rides.truncate(limit);
        Ok(rides)
    }

    async fn dispatch_candidates(&self) -> Result<Vec<ChairCandidate>, ServiceError> {
        self.check_online()?;
        let state = self.state.lock().await;
        let candidates = state
            .chairs
            .values()
            .filter(|c| c.is_active && state.is_available(c.id))
            .filter_map(|c| {
                let speed = *state.chair_models.get(&c.model)?;
                let location = state.locations.get(&c.id)?;
                (speed > 0).then_some(ChairCandidate {
                    chair_id: c.id,
                    speed,
                    position: location.position,
                })
            })
            .collect();
        Ok(candidates)
    }

    async fn assign_chair(
        &self,
        ride_id: RideId,
        chair_id: ChairId,
    ) -> Result<AssignOutcome, ServiceError> {
        self.check_online()?;
        let mut state = self.state.lock().await;

        let chair_ok = state.chairs.get(&chair_id).is_some_and(|c| c.is_active)
            && state.is_available(chair_id);
        if !chair_ok {
            return Ok(AssignOutcome::ChairUnavailable);
        }

        let ride_open = state
            .rides
            .get(&ride_id)
            .is_some_and(|s| s.ride.chair_id.is_none())
            && !state.is_canceled(ride_id);
        if !ride_open {
            return Ok(AssignOutcome::RideTaken);
        }

        let touched = state.touch();
        if let Some(stored) = state.rides.get_mut(&ride_id) {
            stored.ride.chair_id = Some(chair_id);
            stored.ride.updated_at = Utc::now();
            stored.touched = touched;
        }
        state.availability.insert(chair_id, false);
        Ok(AssignOutcome::Assigned)
    }

    async fn chair_by_token(&self, token: &str) -> Result<Option<Chair>, ServiceError> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state
            .chairs
            .values()
            .find(|c| c.access_token == token)
            .cloned())
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<UserId>, ServiceError> {
        self.check_online()?;
        Ok(self.state.lock().await.users.get(token).copied())
    }
}

/// A serialized in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    /// `Some` until committed; restored on rollback or drop.
    snapshot: Option<MemoryState>,
}

impl fmt::Debug for MemoryTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTx")
            .field("open", &self.snapshot.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn ride_for_update(&mut self, ride_id: RideId) -> Result<Option<Ride>, ServiceError> {
        Ok(self.guard.rides.get(&ride_id).map(|s| s.ride.clone()))
    }

    async fn insert_ride(&mut self, ride: &Ride) -> Result<(), ServiceError> {
        if self.guard.rides.contains_key(&ride.id) {
            return Err(ServiceError::Persistence(format!(
                "duplicate ride id {}",
                ride.id
            )));
        }
        let touched = self.guard.touch();
        self.guard.rides.insert(
            ride.id,
            StoredRide {
                ride: ride.clone(),
                touched,
            },
        );
        Ok(())
    }

    async fn latest_ride_for_chair(
        &mut self,
        chair_id: ChairId,
    ) -> Result<Option<Ride>, ServiceError> {
        Ok(self
            .guard
            .rides
            .values()
            .filter(|s| s.ride.chair_id == Some(chair_id))
            .max_by(|a, b| {
                a.ride
                    .updated_at
                    .cmp(&b.ride.updated_at)
                    .then(a.touched.cmp(&b.touched))
            })
            .map(|s| s.ride.clone()))
    }

    async fn has_active_ride(&mut self, user_id: UserId) -> Result<bool, ServiceError> {
        let state = &*self.guard;
        Ok(state
            .rides
            .values()
            .filter(|s| s.ride.user_id == user_id)
            .any(|s| {
                state
                    .latest_status(s.ride.id)
                    .is_some_and(|e| !e.status.is_terminal())
            }))
    }

    async fn set_evaluation(
        &mut self,
        ride_id: RideId,
        evaluation: Evaluation,
    ) -> Result<Ride, ServiceError> {
        let touched = self.guard.touch();
        let stored = self
            .guard
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| ServiceError::NotFound(format!("ride {ride_id} not found")))?;
        stored.ride.evaluation = Some(evaluation.get());
        stored.ride.updated_at = Utc::now();
        stored.touched = touched;
        Ok(stored.ride.clone())
    }

    async fn advance_chair_location(
        &mut self,
        chair_id: ChairId,
        position: Coordinate,
    ) -> Result<ChairLocation, ServiceError> {
        let now = Utc::now();
        let record = match self.guard.locations.get(&chair_id) {
            Some(previous) => previous.advance(position, now),
            None => ChairLocation::first(chair_id, position, now),
        };
        self.guard.locations.insert(chair_id, record.clone());
        Ok(record)
    }

    async fn latest_status(
        &mut self,
        ride_id: RideId,
    ) -> Result<Option<StatusEvent>, ServiceError> {
        Ok(self.guard.latest_status(ride_id).cloned())
    }

    async fn append_status(
        &mut self,
        ride_id: RideId,
        status: RideStatus,
    ) -> Result<StatusEvent, ServiceError> {
        Ok(push_status(&mut self.guard, ride_id, status))
    }

    async fn set_chair_available(
        &mut self,
        chair_id: ChairId,
        available: bool,
    ) -> Result<(), ServiceError> {
        self.guard.availability.insert(chair_id, available);
        Ok(())
    }

    async fn payment_token(&mut self, user_id: UserId) -> Result<Option<String>, ServiceError> {
        Ok(self.guard.payment_tokens.get(&user_id).cloned())
    }

    async fn commit(self: Box<Self>) -> Result<(), ServiceError> {
        let mut this = self;
        this.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ServiceError> {
        // Drop restores the snapshot.
        Ok(())
    }
}
