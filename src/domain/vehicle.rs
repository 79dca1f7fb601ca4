//! Vehicle classes and fare tariffs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DispatchError;

/// Class of vehicle a driver is registered with and a rider books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum VehicleClass {
    /// Four-wheeler.
    Car,
    /// Two-wheeler.
    Bike,
    /// Three-wheeler auto-rickshaw.
    Auto,
}

impl VehicleClass {
    /// Canonical name as stored in the system of record.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "Car",
            Self::Bike => "Bike",
            Self::Auto => "Auto",
        }
    }

    /// Fallback tariff used when the system of record has none configured.
    #[must_use]
    pub const fn default_tariff(&self) -> Tariff {
        Tariff {
            base_fare: 50.0,
            per_km_rate: 12.0,
            per_min_rate: 2.0,
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleClass {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Car" | "car" => Ok(Self::Car),
            "Bike" | "bike" => Ok(Self::Bike),
            "Auto" | "auto" => Ok(Self::Auto),
            other => Err(DispatchError::InvalidRequest(format!(
                "unknown vehicle class: {other}"
            ))),
        }
    }
}

/// Per-class pricing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tariff {
    /// Flat amount charged per ride.
    pub base_fare: f64,
    /// Amount per kilometre travelled.
    pub per_km_rate: f64,
    /// Amount per minute of estimated duration.
    pub per_min_rate: f64,
}

impl Tariff {
    /// Prices a trip and adds the platform fee, rounding up to a whole unit.
    #[must_use]
    pub fn fare(&self, distance_m: u32, duration_s: u32, platform_fee_pct: f64) -> f64 {
        let distance_km = f64::from(distance_m) / 1000.0;
        let duration_min = f64::from(duration_s) / 60.0;
        let ride_cost =
            self.base_fare + distance_km * self.per_km_rate + duration_min * self.per_min_rate;
        let platform_fee = ride_cost * (platform_fee_pct / 100.0);
        (ride_cost + platform_fee).ceil()
    }
}
