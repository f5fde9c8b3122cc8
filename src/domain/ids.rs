//! Type-safe identifiers for rides, chairs, owners, and users.
//!
//! Every identifier is a newtype around a [`uuid::Uuid`] (v4) so that a
//! ride id can never be passed where a chair id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier of a ride request.
    ///
    /// Also used verbatim as the payment gateway idempotency key.
    RideId
}

define_id! {
    /// Unique identifier of a chair (vehicle/driver unit).
    ChairId
}

define_id! {
    /// Unique identifier of a chair owner.
    OwnerId
}

define_id! {
    /// Unique identifier of a rider.
    UserId
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(RideId::new(), RideId::new());
        assert_ne!(ChairId::new(), ChairId::new());
    }

    #[test]
    fn display_is_uuid_format() {
        let id = RideId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 36);
        assert_eq!(s, id.as_uuid().to_string());
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let uuid = uuid::Uuid::new_v4();
        let Ok(json) = serde_json::to_string(&ChairId::from_uuid(uuid)) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn ordering_follows_uuid_ordering() {
        let low = ChairId::from_uuid(uuid::Uuid::from_u128(1));
        let high = ChairId::from_uuid(uuid::Uuid::from_u128(2));
        assert!(low < high);
    }
}
