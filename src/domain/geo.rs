//! Validated coordinates and great-circle distance.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DispatchError;

/// Mean Earth radius in kilometres used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Largest latitude magnitude accepted by the geospatial index.
///
/// Web-Mercator geohash encoding (used by Redis GEO) cannot represent
/// points closer to the poles than this, so the limit applies to every
/// index implementation.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Largest longitude magnitude.
pub const MAX_LONGITUDE: f64 = 180.0;

/// A WGS-84 point that has passed range validation.
///
/// Construction goes through [`Coordinate::new`]; deserialization is routed
/// through the same check so an out-of-range or non-finite value can never
/// reach the index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = DispatchError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a coordinate after checking it is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidCoordinate`] for NaN/infinite values,
    /// `|lat| > MAX_LATITUDE` or `|lng| > 180`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DispatchError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(DispatchError::InvalidCoordinate(format!(
                "non-finite value ({latitude}, {longitude})"
            )));
        }
        if latitude.abs() > MAX_LATITUDE {
            return Err(DispatchError::InvalidCoordinate(format!(
                "latitude {latitude} outside ±{MAX_LATITUDE}"
            )));
        }
        if longitude.abs() > MAX_LONGITUDE {
            return Err(DispatchError::InvalidCoordinate(format!(
                "longitude {longitude} outside ±{MAX_LONGITUDE}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to `other` in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(self, other)
    }

    /// Formats the point as `"lat,lng"` with six decimals.
    #[must_use]
    pub fn to_lat_lng_string(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Haversine distance between two points in kilometres, using
/// [`EARTH_RADIUS_KM`].
#[must_use]
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (d_lng / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}
