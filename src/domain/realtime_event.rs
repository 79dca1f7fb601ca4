//! Events delivered over the realtime channel and the ride-request bus.
//!
//! [`RideRequestEvent`] travels between processes on the broker topic.
//! [`ServerEvent`] is what a connected client receives, wrapped in the
//! `{"event": .., "data": ..}` envelope by its serde representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinate, DriverId, NearbyDriver, RideId, RideStatus, RiderId, VehicleClass};

/// A newly requested ride, published for dispatch to candidate drivers.
///
/// Transient: exists only on the bus between publish and delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequestEvent {
    /// Ride identifier.
    pub ride_id: RideId,
    /// Requesting rider.
    #[serde(rename = "userId")]
    pub rider_id: RiderId,
    /// Pickup point.
    pub pickup: Coordinate,
    /// Pickup display name.
    pub pickup_name: String,
    /// Destination label.
    pub destination: String,
    /// Quoted fare.
    pub fare: f64,
    /// Quoted distance in metres.
    pub distance: u32,
    /// Quoted duration in seconds.
    pub duration: u32,
    /// Requested vehicle class.
    pub vehicle_class: VehicleClass,
    /// Drivers that passed the eligibility filter on the publishing process.
    ///
    /// Receivers only deliver to drivers in this set; an empty set reaches
    /// nobody. Required on the wire.
    pub candidates: Vec<DriverId>,
}

impl RideRequestEvent {
    /// The driver-facing part of the request, without the candidate set.
    #[must_use]
    pub fn offer(&self) -> RideOffer {
        RideOffer {
            ride_id: self.ride_id,
            rider_id: self.rider_id,
            pickup: self.pickup,
            pickup_name: self.pickup_name.clone(),
            destination: self.destination.clone(),
            fare: self.fare,
            distance: self.distance,
            duration: self.duration,
            vehicle_class: self.vehicle_class,
        }
    }
}

/// Payload of `newRide`: a ride request as one driver sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideOffer {
    /// Ride identifier.
    pub ride_id: RideId,
    /// Requesting rider.
    #[serde(rename = "userId")]
    pub rider_id: RiderId,
    /// Pickup point.
    pub pickup: Coordinate,
    /// Pickup display name.
    pub pickup_name: String,
    /// Destination label.
    pub destination: String,
    /// Quoted fare.
    pub fare: f64,
    /// Quoted distance in metres.
    pub distance: u32,
    /// Quoted duration in seconds.
    pub duration: u32,
    /// Requested vehicle class.
    pub vehicle_class: VehicleClass,
}

/// A driver position relayed to the rider of an ongoing ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRelay {
    /// Driver sending the heartbeat.
    pub driver_id: DriverId,
    /// Rider receiving it.
    #[serde(rename = "userId")]
    pub rider_id: RiderId,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Compass heading, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

/// A ride status change pushed to the rider or the assigned driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStatusEvent {
    /// Ride identifier.
    pub ride_id: RideId,
    /// New status.
    pub status: RideStatus,
    /// Assigned driver, if any.
    pub driver_id: Option<DriverId>,
    /// When the change was applied.
    pub timestamp: DateTime<Utc>,
}

/// Server → client realtime message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Reply to `requestRide`: drivers around the rider, nearest first.
    NearbyDrivers {
        /// Nearby drivers ordered by distance.
        drivers: Vec<NearbyDriver>,
    },
    /// Live location of the assigned driver.
    RideUpdate(LocationRelay),
    /// A ride request offered to a driver.
    NewRide(RideOffer),
    /// Ride lifecycle change.
    RideStatus(RideStatusEvent),
    /// Rejected client message.
    Error {
        /// Numeric error code.
        code: u32,
        /// Human-readable message.
        message: String,
    },
}

impl ServerEvent {
    /// Returns the event name as sent on the wire.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::NearbyDrivers { .. } => "nearbyDrivers",
            Self::RideUpdate(_) => "rideUpdate",
            Self::NewRide(_) => "newRide",
            Self::RideStatus(_) => "rideStatus",
            Self::Error { .. } => "error",
        }
    }

    /// Serializes the event to its JSON text frame.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
