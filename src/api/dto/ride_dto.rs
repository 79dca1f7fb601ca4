//! Ride DTOs: estimate, create, cancel.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::PlaceDto;
use crate::domain::{RideId, RideStatus, RiderId, RouteToken, VehicleClass};

/// Request body for `POST /rides/estimate`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRideRequest {
    /// Pickup point.
    pub origin: PlaceDto,
    /// Drop-off point.
    pub destination: PlaceDto,
    /// Vehicle class to price for.
    pub vehicle_class: VehicleClass,
}

/// Response body for `POST /rides/estimate`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRideResponse {
    /// Opaque token to redeem when creating the ride.
    pub route_token: RouteToken,
    /// Encoded route polyline.
    pub polyline: String,
    /// Route distance in metres.
    pub distance_meters: u32,
    /// Route duration in seconds.
    pub duration_seconds: u32,
    /// Total fare including platform fee.
    pub fare: f64,
    /// Vehicle class the fare was computed for.
    pub vehicle_class: VehicleClass,
    /// Seconds until the token expires.
    pub expires_in_secs: u64,
}

/// Request body for `POST /rides`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    /// Token returned by the estimate.
    pub route_token: String,
    /// Rider requesting the ride.
    pub rider_id: RiderId,
    /// Must match the quoted class when given.
    #[serde(default)]
    pub vehicle_class: Option<VehicleClass>,
}

/// Response body for `POST /rides` (201 Created).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideResponse {
    /// New ride identifier.
    pub ride_id: RideId,
    /// Always `Requested`.
    pub status: RideStatus,
    /// Quoted fare.
    pub fare: f64,
    /// Drivers found within the dispatch radius.
    pub nearby_driver_count: usize,
}

/// Request body for `POST /rides/{id}/cancel`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelRideRequest {
    /// Rider that owns the ride.
    pub rider_id: RiderId,
    /// Optional free-text reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// `?riderId=..` query parameter.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RiderQuery {
    /// Rider that owns the ride.
    pub rider_id: RiderId,
}

/// Live position of the assigned driver.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationResponse {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Compass heading, if reported.
    pub heading: Option<f64>,
    /// When the heartbeat was accepted.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
