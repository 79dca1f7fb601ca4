//! Ride records and the ride-status lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Coordinate, DriverId, RideId, RiderId, RouteToken, VehicleClass};
use crate::error::DispatchError;

/// Lifecycle status of a ride.
///
/// ```text
/// Requested ──► Accepted ──► InProgress ──► Completed
///     │             │
///     └─────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RideStatus {
    /// Created, waiting for a driver.
    Requested,
    /// A driver won the race and is on the way.
    Accepted,
    /// Rider picked up.
    InProgress,
    /// Trip finished.
    Completed,
    /// Cancelled by the rider or the assigned driver.
    Cancelled,
}

impl RideStatus {
    /// Canonical name as stored in the system of record.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Accepted => "Accepted",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Status a driver-initiated transition into `self` must start from.
    ///
    /// Returns `None` for `Requested`, which is only ever set on creation.
    #[must_use]
    pub const fn driver_predecessor(&self) -> Option<Self> {
        match self {
            Self::Requested => None,
            Self::Accepted => Some(Self::Requested),
            Self::InProgress | Self::Cancelled => Some(Self::Accepted),
            Self::Completed => Some(Self::InProgress),
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a rider may still cancel from this status.
    #[must_use]
    pub const fn is_rider_cancellable(&self) -> bool {
        matches!(self, Self::Requested | Self::Accepted)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Requested" => Ok(Self::Requested),
            "Accepted" => Ok(Self::Accepted),
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(DispatchError::InvalidRequest(format!(
                "unknown ride status: {other}"
            ))),
        }
    }
}

/// Fields needed to persist a new ride from a redeemed quote.
#[derive(Debug, Clone)]
pub struct NewRide {
    /// Rider requesting the trip.
    pub rider_id: RiderId,
    /// Token of the quote the ride was created from.
    pub route_token: RouteToken,
    /// Quoted fare.
    pub fare: f64,
    /// Quoted distance in metres.
    pub distance_m: u32,
    /// Quoted duration in seconds.
    pub duration_s: u32,
    /// Booked vehicle class.
    pub vehicle_class: VehicleClass,
    /// Pickup point.
    pub origin: Coordinate,
    /// Drop-off point.
    pub destination: Coordinate,
    /// Pickup display name.
    pub origin_name: String,
    /// Drop-off display name.
    pub destination_name: String,
    /// Encoded route polyline.
    pub polyline: String,
}

/// A ride as held by the system of record.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    /// Ride identifier.
    pub id: RideId,
    /// Rider who requested the ride.
    pub rider_id: RiderId,
    /// Assigned driver, once accepted.
    pub driver_id: Option<DriverId>,
    /// Current lifecycle status.
    pub status: RideStatus,
    /// Quoted fare.
    pub fare: f64,
    /// Quoted distance in metres.
    pub distance_m: u32,
    /// Quoted duration in seconds.
    pub duration_s: u32,
    /// Booked vehicle class.
    pub vehicle_class: VehicleClass,
    /// Pickup point.
    pub origin: Coordinate,
    /// Drop-off point.
    pub destination: Coordinate,
    /// Pickup display name.
    pub origin_name: String,
    /// Drop-off display name.
    pub destination_name: String,
    /// Encoded route polyline.
    pub polyline: String,
    /// Token of the quote the ride was created from.
    pub route_token: RouteToken,
    /// Reason given on cancellation.
    pub cancel_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    /// Builds a freshly requested ride from a [`NewRide`].
    #[must_use]
    pub fn requested(id: RideId, new: NewRide) -> Self {
        let now = Utc::now();
        Self {
            id,
            rider_id: new.rider_id,
            driver_id: None,
            status: RideStatus::Requested,
            fare: new.fare,
            distance_m: new.distance_m,
            duration_s: new.duration_s,
            vehicle_class: new.vehicle_class,
            origin: new.origin,
            destination: new.destination,
            origin_name: new.origin_name,
            destination_name: new.destination_name,
            polyline: new.polyline,
            route_token: new.route_token,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of a compare-and-swap status transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The ride matched the expected status and was updated.
    Applied(Ride),
    /// The ride exists but was not in the expected status (or belongs to
    /// another driver); nothing changed.
    Conflict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_starts_from_requested() {
        assert_eq!(
            RideStatus::Accepted.driver_predecessor(),
            Some(RideStatus::Requested)
        );
        assert_eq!(RideStatus::Requested.driver_predecessor(), None);
        assert_eq!(
            RideStatus::Completed.driver_predecessor(),
            Some(RideStatus::InProgress)
        );
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            RideStatus::Requested,
            RideStatus::Accepted,
            RideStatus::InProgress,
            RideStatus::Completed,
            RideStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<RideStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn terminal_and_cancellable() {
        assert!(RideStatus::Completed.is_terminal());
        assert!(!RideStatus::Accepted.is_terminal());
        assert!(RideStatus::Accepted.is_rider_cancellable());
        assert!(!RideStatus::InProgress.is_rider_cancellable());
    }
}
