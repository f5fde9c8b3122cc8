//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::payment::{FareCalculator, PaymentGateway, RetryPolicy};
use crate::persistence::Store;
use crate::service::{DispatchService, LocationService, RideService, SettlementService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Store used directly by the token extractors.
    pub store: Arc<dyn Store>,
    /// Dispatch engine, shared with the background loop.
    pub dispatch: Arc<DispatchService>,
    /// Chair position tracking.
    pub locations: Arc<LocationService>,
    /// Ride requests and reported status changes.
    pub rides: Arc<RideService>,
    /// Evaluation and payment.
    pub settlement: Arc<SettlementService>,
}

impl AppState {
    /// Wires every service to the same store.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        fares: Arc<dyn FareCalculator>,
        retry: RetryPolicy,
        dispatch_batch_size: usize,
    ) -> Self {
        Self {
            dispatch: Arc::new(DispatchService::new(
                Arc::clone(&store),
                dispatch_batch_size,
            )),
            locations: Arc::new(LocationService::new(Arc::clone(&store))),
            rides: Arc::new(RideService::new(Arc::clone(&store), Arc::clone(&fares))),
            settlement: Arc::new(SettlementService::new(
                Arc::clone(&store),
                gateway,
                fares,
                retry,
            )),
            store,
        }
    }
}
