//! # ride-dispatch
//!
//! Dispatch core of a ride-hailing platform: matches waiting rides to
//! available chairs, tracks chair positions and odometers, drives the
//! ride lifecycle, and settles payment on completion.
//!
//! The service keeps no authoritative state in memory. Every operation
//! runs as a unit of work against the relational store, so several
//! instances can serve the same database.
//!
//! ## Architecture
//!
//! ```text
//! Clients (chairs, rider app, platform trigger)
//!     │
//!     ├── REST Handlers + bearer extractors (api/)
//!     │
//!     ├── DispatchService ◄── background dispatch loop
//!     ├── LocationService
//!     ├── RideService
//!     ├── SettlementService ──► RetryPolicy ──► PaymentGateway (payment/)
//!     │        │
//!     │        └── status_ledger (service/)
//!     │
//!     ├── matching policy, rides, chairs (domain/)
//!     │
//!     └── Store / StoreTx ──► PostgreSQL (persistence/)
//! ```
//!
//! ## Ride lifecycle
//!
//! ```text
//! MATCHING → ENROUTE → PICKUP → CARRYING → ARRIVED → COMPLETED
//!     └──────────┴─────────┴────────┴─────────┴──→ CANCELED
//! ```
//!
//! `ENROUTE` and `CARRYING` are reported by the chair, `PICKUP` and
//! `ARRIVED` are derived from position reports, `COMPLETED` is appended
//! once the payment is confirmed.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod openapi;
pub mod payment;
pub mod persistence;
pub mod service;
