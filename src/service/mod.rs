//! Service layer: the operations the HTTP handlers and the background
//! dispatcher invoke.
//!
//! Services own no state between calls. Each operation opens a unit of
//! work on the [`crate::persistence::Store`], applies its rules, and
//! commits or rolls back as a whole.

pub mod dispatch_service;
pub mod location_service;
pub mod ride_service;
pub mod settlement_service;
pub mod status_ledger;

#[cfg(test)]
pub(crate) mod fixtures;

pub use dispatch_service::{CycleOutcome, CycleReport, DispatchService, spawn_dispatch_loop};
pub use location_service::{LocationReport, LocationService};
pub use ride_service::{RideRequested, RideService};
pub use settlement_service::{Settlement, SettlementService};
