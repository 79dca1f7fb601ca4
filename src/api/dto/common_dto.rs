//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Coordinate;
use crate::error::DispatchError;

/// A point as sent by clients, validated on conversion.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlaceDto {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl PlaceDto {
    /// Validates the point.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidCoordinate`] for out-of-range or
    /// non-finite values.
    pub fn coordinate(&self) -> Result<Coordinate, DispatchError> {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Display name, falling back to the formatted coordinate.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{:.6},{:.6}", self.latitude, self.longitude),
        }
    }
}

/// `?lat=..&lng=..` query parameters.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct LatLngQuery {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl LatLngQuery {
    /// Validates the point.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidCoordinate`] for out-of-range or
    /// non-finite values.
    pub fn coordinate(&self) -> Result<Coordinate, DispatchError> {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Simple acknowledgement body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// Creates a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
