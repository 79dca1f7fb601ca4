//! Driver DTOs: heartbeat, availability, ride status, nearby search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{DriverId, DriverStatus, NearbyDriver, RideStatus};

/// Request body for `PUT /drivers/{id}/location`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LocationUpdateRequest {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Compass heading in degrees.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Ground speed in m/s.
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Response body for an accepted heartbeat.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdateResponse {
    /// Driver the heartbeat was recorded for.
    pub driver_id: DriverId,
    /// Server time the heartbeat was accepted.
    pub updated_at: DateTime<Utc>,
}

/// Request body for `PUT /drivers/{id}/availability`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    /// `true` to go online.
    pub online: bool,
}

/// Request body for `PUT /drivers/{id}/notification-token`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NotificationTokenRequest {
    /// Push device token.
    pub token: String,
}

/// Request body for `PUT /drivers/{id}/rides/{ride_id}/status`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RideStatusRequest {
    /// Target status: `Accepted`, `InProgress`, `Completed` or `Cancelled`.
    pub status: RideStatus,
}

/// Request body for `PUT /admin/drivers/{id}/status`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DriverStatusRequest {
    /// New account status.
    pub status: DriverStatus,
}

/// Query for `GET /drivers/nearby`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Search radius; defaults to the dispatch radius.
    #[serde(default)]
    pub radius_km: Option<f64>,
}

/// Response body for `GET /drivers/nearby`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NearbyResponse {
    /// Number of drivers found.
    pub count: usize,
    /// Drivers ordered by distance.
    pub drivers: Vec<NearbyDriver>,
}
