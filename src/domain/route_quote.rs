//! Priced trip quotes and their opaque redemption tokens.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Coordinate, VehicleClass};

/// Opaque, unguessable capability referencing a cached quote.
///
/// Backed by 122 random bits (UUID v4) and rendered without hyphens so it
/// does not read like a record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(into = "String", try_from = "String")]
#[schema(value_type = String)]
pub struct RouteToken(uuid::Uuid);

impl RouteToken {
    /// Generates a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl fmt::Display for RouteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RouteToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<uuid::Uuid>().map(Self)
    }
}

impl From<RouteToken> for String {
    fn from(token: RouteToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for RouteToken {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<uuid::Uuid> for RouteToken {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

/// A server-priced, geometry-resolved trip quote.
///
/// Stored under a [`RouteToken`] so the client only ever echoes the token
/// back; fare and geometry cannot be tampered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuote {
    /// Encoded route polyline.
    pub polyline: String,
    /// Route distance in metres.
    pub distance_m: u32,
    /// Route duration in seconds.
    pub duration_s: u32,
    /// Total fare including platform fee.
    pub fare: f64,
    /// Vehicle class the fare was computed for.
    pub vehicle_class: VehicleClass,
    /// Pickup point.
    pub origin: Coordinate,
    /// Drop-off point.
    pub destination: Coordinate,
    /// Pickup display name.
    pub origin_name: String,
    /// Drop-off display name.
    pub destination_name: String,
    /// Reference returned by the route planner, if any.
    pub external_route_ref: Option<String>,
    /// When the quote was produced.
    pub quoted_at: DateTime<Utc>,
}
