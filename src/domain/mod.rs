//! Domain layer: identifiers, rides and their lifecycle, chairs, and the
//! matching policy.
//!
//! Types here carry no I/O. The service layer loads them from a
//! [`crate::persistence::Store`], applies the rules defined here, and
//! writes the results back.

pub mod chair;
pub mod coordinate;
pub mod ids;
pub mod matching;
pub mod ride;

pub use chair::{Chair, ChairCandidate, ChairLocation};
pub use coordinate::Coordinate;
pub use ids::{ChairId, OwnerId, RideId, UserId};
pub use matching::{CandidatePool, Score};
pub use ride::{Evaluation, Ride, RideStatus, StatusEvent};
