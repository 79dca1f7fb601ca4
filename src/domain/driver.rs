//! Driver positions, account state, and dispatch candidates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Coordinate, DriverId, SessionId, VehicleClass};
use crate::error::DispatchError;

/// Administrative account status of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    /// Registered, waiting for admin approval.
    Pending,
    /// Approved and allowed to go online.
    Active,
    /// Voluntarily deactivated or logged out.
    Inactive,
    /// Blocked by an administrator.
    Suspended,
    /// Registration refused.
    Rejected,
}

impl DriverStatus {
    /// Canonical name as stored in the system of record.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
            Self::Rejected => "rejected",
        }
    }

    /// Human-readable reason a driver in this status may not go online.
    #[must_use]
    pub const fn denial_reason(&self) -> &'static str {
        match self {
            Self::Active => "account is active",
            Self::Pending => "account is not approved yet",
            Self::Inactive => "account is inactive",
            Self::Suspended => "account has been suspended",
            Self::Rejected => "registration was rejected",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            "rejected" => Ok(Self::Rejected),
            other => Err(DispatchError::InvalidRequest(format!(
                "unknown driver status: {other}"
            ))),
        }
    }
}

/// Driver account state held by the system of record.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DriverAccount {
    /// Driver identifier.
    pub id: DriverId,
    /// Display name.
    pub name: String,
    /// Registered vehicle class.
    pub vehicle_class: VehicleClass,
    /// Administrative status.
    pub status: DriverStatus,
    /// Whether the driver toggled themselves online.
    pub is_online: bool,
    /// Push-notification device token, if registered.
    pub notification_token: Option<String>,
}

impl DriverAccount {
    /// Whether the account may act on rides (online and approved).
    #[must_use]
    pub fn can_take_rides(&self) -> bool {
        self.is_online && self.status == DriverStatus::Active
    }

    /// Whether the account passes the dispatch eligibility filter for
    /// `class`: online, active, matching vehicle, push endpoint present.
    #[must_use]
    pub fn is_dispatchable(&self, class: VehicleClass) -> bool {
        self.can_take_rides()
            && self.vehicle_class == class
            && self
                .notification_token
                .as_deref()
                .is_some_and(|t| !t.is_empty())
    }
}

/// A driver that passed the eligibility filter, with its push endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleDriver {
    /// Driver identifier.
    pub driver_id: DriverId,
    /// Push-notification device token.
    pub notification_token: String,
}

/// Last known position of a driver.
///
/// Written only by the heartbeat path; expires after an idle period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPosition {
    /// Driver identifier.
    pub driver_id: DriverId,
    /// Reported position.
    pub coordinate: Coordinate,
    /// Compass heading in degrees, if reported.
    pub heading: Option<f64>,
    /// Ground speed in m/s, if reported.
    pub speed: Option<f64>,
    /// Realtime session that reported the position, if any (HTTP heartbeats
    /// have none).
    pub session_id: Option<SessionId>,
    /// Server time the heartbeat was accepted.
    pub updated_at: DateTime<Utc>,
}

impl DriverPosition {
    /// Creates a position stamped with the current time.
    #[must_use]
    pub fn new(driver_id: DriverId, coordinate: Coordinate, session_id: Option<SessionId>) -> Self {
        Self {
            driver_id,
            coordinate,
            heading: None,
            speed: None,
            session_id,
            updated_at: Utc::now(),
        }
    }

    /// Sets heading and speed.
    #[must_use]
    pub fn with_motion(mut self, heading: Option<f64>, speed: Option<f64>) -> Self {
        self.heading = heading.filter(|h| h.is_finite());
        self.speed = speed.filter(|s| s.is_finite());
        self
    }
}

/// One result of a radius query, ordered by distance from the query point.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriver {
    /// Driver identifier.
    pub driver_id: DriverId,
    /// Indexed position.
    pub coordinate: Coordinate,
    /// Distance from the query point in kilometres.
    pub distance_km: f64,
    /// Session that owns the position, if any.
    #[schema(value_type = Option<String>)]
    pub session_id: Option<SessionId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(status: DriverStatus, online: bool, token: Option<&str>) -> DriverAccount {
        DriverAccount {
            id: DriverId::new(),
            name: "Asha".to_string(),
            vehicle_class: VehicleClass::Car,
            status,
            is_online: online,
            notification_token: token.map(str::to_string),
        }
    }

    #[test]
    fn dispatchable_needs_every_condition() {
        assert!(account(DriverStatus::Active, true, Some("tok")).is_dispatchable(VehicleClass::Car));
        assert!(!account(DriverStatus::Active, true, Some("tok")).is_dispatchable(VehicleClass::Bike));
        assert!(!account(DriverStatus::Active, false, Some("tok")).is_dispatchable(VehicleClass::Car));
        assert!(!account(DriverStatus::Suspended, true, Some("tok")).is_dispatchable(VehicleClass::Car));
        assert!(!account(DriverStatus::Active, true, Some("")).is_dispatchable(VehicleClass::Car));
        assert!(!account(DriverStatus::Active, true, None).is_dispatchable(VehicleClass::Car));
    }

    #[test]
    fn motion_drops_non_finite_values() {
        let Ok(c) = Coordinate::new(12.9, 77.6) else {
            return;
        };
        let p = DriverPosition::new(DriverId::new(), c, None).with_motion(Some(f64::NAN), Some(4.0));
        assert_eq!(p.heading, None);
        assert_eq!(p.speed, Some(4.0));
    }

    #[test]
    fn status_parses_lowercase() {
        assert_eq!("suspended".parse::<DriverStatus>().ok(), Some(DriverStatus::Suspended));
        assert!("Active".parse::<DriverStatus>().is_err());
    }
}
