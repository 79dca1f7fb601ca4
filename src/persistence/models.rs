//! Database row types and their conversion into domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Coordinate, DriverAccount, DriverId, DriverStatus, Ride, RideId, RideStatus, RiderId,
    RouteToken, VehicleClass,
};
use crate::error::DispatchError;

fn corrupt(what: &str, err: impl std::fmt::Display) -> DispatchError {
    DispatchError::Internal(format!("corrupt {what} row: {err}"))
}

/// A row of the `drivers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DriverRow {
    /// Driver identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Vehicle class name.
    pub vehicle_class: String,
    /// Administrative status name.
    pub status: String,
    /// Online flag.
    pub is_online: bool,
    /// Push-notification token.
    pub notification_token: Option<String>,
}

impl TryFrom<DriverRow> for DriverAccount {
    type Error = DispatchError;

    fn try_from(row: DriverRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DriverId::from_uuid(row.id),
            name: row.name,
            vehicle_class: row
                .vehicle_class
                .parse::<VehicleClass>()
                .map_err(|e| corrupt("driver", e))?,
            status: row
                .status
                .parse::<DriverStatus>()
                .map_err(|e| corrupt("driver", e))?,
            is_online: row.is_online,
            notification_token: row.notification_token,
        })
    }
}

/// A row of the `rides` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RideRow {
    /// Ride identifier.
    pub id: Uuid,
    /// Requesting rider.
    pub rider_id: Uuid,
    /// Assigned driver.
    pub driver_id: Option<Uuid>,
    /// Status name.
    pub status: String,
    /// Quoted fare.
    pub fare: f64,
    /// Quoted distance in metres.
    pub distance_m: i32,
    /// Quoted duration in seconds.
    pub duration_s: i32,
    /// Vehicle class name.
    pub vehicle_class: String,
    /// Pickup latitude.
    pub origin_lat: f64,
    /// Pickup longitude.
    pub origin_lng: f64,
    /// Drop-off latitude.
    pub destination_lat: f64,
    /// Drop-off longitude.
    pub destination_lng: f64,
    /// Pickup display name.
    pub origin_name: String,
    /// Drop-off display name.
    pub destination_name: String,
    /// Encoded polyline.
    pub polyline: String,
    /// Token of the redeemed quote.
    pub route_token: String,
    /// Cancellation reason.
    pub cancel_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RideRow> for Ride {
    type Error = DispatchError;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RideId::from_uuid(row.id),
            rider_id: RiderId::from_uuid(row.rider_id),
            driver_id: row.driver_id.map(DriverId::from_uuid),
            status: row
                .status
                .parse::<RideStatus>()
                .map_err(|e| corrupt("ride", e))?,
            fare: row.fare,
            distance_m: u32::try_from(row.distance_m).unwrap_or(0),
            duration_s: u32::try_from(row.duration_s).unwrap_or(0),
            vehicle_class: row
                .vehicle_class
                .parse::<VehicleClass>()
                .map_err(|e| corrupt("ride", e))?,
            origin: Coordinate::new(row.origin_lat, row.origin_lng)
                .map_err(|e| corrupt("ride", e))?,
            destination: Coordinate::new(row.destination_lat, row.destination_lng)
                .map_err(|e| corrupt("ride", e))?,
            origin_name: row.origin_name,
            destination_name: row.destination_name,
            polyline: row.polyline,
            route_token: row
                .route_token
                .parse::<RouteToken>()
                .map_err(|e| corrupt("ride", e))?,
            cancel_reason: row.cancel_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
