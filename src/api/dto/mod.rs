//! Data Transfer Objects for REST request/response serialization.
//!
//! Timestamps on the wire are unix milliseconds; identifiers are UUID
//! strings.

pub mod chair_dto;
pub mod ride_dto;

pub use chair_dto::*;
pub use ride_dto::*;
