//! Type-safe identifiers.
//!
//! Every identifier is a newtype around [`uuid::Uuid`] (v4) so that a driver
//! ID can never be passed where a ride ID is expected. All of them serialize
//! transparently as the hyphenated UUID string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing [`uuid::Uuid`].
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

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<uuid::Uuid>().map(Self)
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

uuid_id! {
    /// Unique identifier for a driver account.
    ///
    /// Used as the member name in the geospatial index, as the realtime
    /// room suffix (`driver:<id>`), and as the system-of-record key.
    DriverId
}

uuid_id! {
    /// Unique identifier for a rider (end-user) account.
    ///
    /// A rider's realtime room is keyed by this identifier alone.
    RiderId
}

uuid_id! {
    /// Unique identifier for a ride record.
    RideId
}

uuid_id! {
    /// Identifier of one realtime (WebSocket) session.
    ///
    /// Recorded on each driver position so the owning connection can be
    /// told apart from a newer one when it disconnects.
    SessionId
}
