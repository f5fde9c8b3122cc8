//! Dispatch engine: matches waiting rides to available chairs.
//!
//! A cycle snapshots the unmatched rides and the candidate chairs, orders
//! the rides with [`matching::sort_for_dispatch`], and for each ride
//! claims the best-scoring chair through the store's atomic conditional
//! assignment. Losing a race is expected under concurrency and never
//! produces a double assignment:
//!
//! - the ride was taken: move on to the next ride;
//! - the chair was taken: drop it from the pool and retry the same ride.
//!
//! At most one cycle runs at a time per service instance; a trigger that
//! arrives while a cycle is running is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::matching::{self, CandidatePool};
use crate::error::ServiceError;
use crate::persistence::{AssignOutcome, Store};

/// Counters describing one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Unmatched rides loaded for the cycle.
    pub waiting: usize,
    /// Candidate chairs loaded for the cycle.
    pub candidates: usize,
    /// Rides that received a chair.
    pub assigned: usize,
    /// Conditional assignments that lost a race.
    pub lost_races: usize,
    /// Rides skipped because their assignment failed in the store.
    pub failed: usize,
}

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to completion.
    Completed(CycleReport),
    /// Another cycle was already running.
    Skipped,
}

/// Runs dispatch cycles against a [`Store`].
#[derive(Debug)]
pub struct DispatchService {
    store: Arc<dyn Store>,
    batch_size: usize,
    cycle_guard: Mutex<()>,
}

impl DispatchService {
    /// Creates a dispatcher that considers at most `batch_size` rides per
    /// cycle.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size,
            cycle_guard: Mutex::new(()),
        }
    }

    /// Runs one dispatch cycle, unless one is already in progress.
    ///
    /// Safe to call from the HTTP trigger and the background loop at the
    /// same time.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] when the rides or candidates
    /// cannot be loaded. Nothing has been assigned in that case. Failures
    /// of individual assignments are counted in [`CycleReport::failed`]
    /// instead.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, ServiceError> {
        let Ok(_running) = self.cycle_guard.try_lock() else {
            debug!("dispatch cycle already running, trigger skipped");
            return Ok(CycleOutcome::Skipped);
        };
        let report = self.match_waiting_rides().await?;
        if report.waiting > 0 {
            info!(
                waiting = report.waiting,
                candidates = report.candidates,
                assigned = report.assigned,
                lost_races = report.lost_races,
                failed = report.failed,
                "dispatch cycle finished"
            );
        }
        Ok(CycleOutcome::Completed(report))
    }

    async fn match_waiting_rides(&self) -> Result<CycleReport, ServiceError> {
        let mut rides = self.store.unmatched_rides(self.batch_size).await?;
        let mut report = CycleReport {
            waiting: rides.len(),
            ..CycleReport::default()
        };
        if rides.is_empty() {
            return Ok(report);
        }

        let mut pool = CandidatePool::new(self.store.dispatch_candidates().await?);
        report.candidates = pool.len();
        matching::sort_for_dispatch(&mut rides);

        'rides: for ride in &rides {
            loop {
                let Some((chair, score)) = pool.best_for(ride) else {
                    debug!(ride_id = %ride.id, "no candidate chairs left");
                    break 'rides;
                };

                match self.store.assign_chair(ride.id, chair.chair_id).await {
                    Ok(AssignOutcome::Assigned) => {
                        pool.remove(chair.chair_id);
                        report.assigned += 1;
                        info!(
                            ride_id = %ride.id,
                            chair_id = %chair.chair_id,
                            score = score.approx(),
                            "ride assigned"
                        );
                        continue 'rides;
                    }
                    Ok(AssignOutcome::RideTaken) => {
                        report.lost_races += 1;
                        debug!(ride_id = %ride.id, "ride no longer waiting");
                        continue 'rides;
                    }
                    Ok(AssignOutcome::ChairUnavailable) => {
                        report.lost_races += 1;
                        pool.remove(chair.chair_id);
                        debug!(chair_id = %chair.chair_id, "chair no longer available");
                    }
                    Err(err) => {
                        report.failed += 1;
                        warn!(ride_id = %ride.id, error = %err, "assignment failed, ride skipped");
                        continue 'rides;
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Spawns the background loop that triggers a cycle every `period`.
///
/// Ticks missed while a slow cycle runs are skipped rather than bunched.
pub fn spawn_dispatch_loop(service: Arc<DispatchService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis(), "background dispatch started");
        loop {
            ticker.tick().await;
            if let Err(err) = service.run_cycle().await {
                warn!(error = %err, "dispatch cycle aborted");
            }
        }
    })
}
