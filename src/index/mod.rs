//! Geospatial driver index: "where is every online driver right now".
//!
//! The [`DriverIndex`] trait is the seam between the hot heartbeat path and
//! the store holding positions. Two implementations are provided:
//!
//! - [`InMemoryDriverIndex`] — single-process, used in development and tests.
//! - [`RedisDriverIndex`] — Redis GEO set plus per-driver metadata keys,
//!   shared by every process of the deployment.
//!
//! The index never consults account state. A suspended driver's heartbeat is
//! still accepted here; eligibility is filtered downstream by the matcher.

pub mod memory;
pub mod redis;

use std::fmt;

use async_trait::async_trait;

pub use self::memory::InMemoryDriverIndex;
pub use self::redis::RedisDriverIndex;
use crate::domain::{Coordinate, DriverId, DriverPosition, NearbyDriver};
use crate::error::DispatchError;

/// Live, expiring view of driver positions with radius queries.
///
/// Every operation is atomic on its own at the store level; no
/// multi-operation transaction spans them. Writes are last-write-wins per
/// driver, ordered by arrival.
#[async_trait]
pub trait DriverIndex: Send + Sync + fmt::Debug {
    /// Upserts a driver's position and refreshes its expiry window.
    ///
    /// Idempotent for repeated identical calls.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if the store cannot be
    /// reached; the heartbeat must then not be reported as accepted.
    async fn update_position(&self, position: DriverPosition) -> Result<(), DispatchError>;

    /// Deletes a driver's position. A driver that is not present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if the store cannot be
    /// reached.
    async fn remove_driver(&self, driver_id: DriverId) -> Result<(), DispatchError>;

    /// Returns unexpired drivers within `radius_km` of `center`, nearest
    /// first. An empty list is a valid result.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] for a non-positive or
    /// non-finite radius, or [`DispatchError::UpstreamUnavailable`] if the
    /// store cannot be reached.
    async fn query_nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<NearbyDriver>, DispatchError>;

    /// Returns the current unexpired position of one driver.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if the store cannot be
    /// reached.
    async fn position(&self, driver_id: DriverId) -> Result<Option<DriverPosition>, DispatchError>;

    /// Checks the backing store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if it is not.
    async fn ping(&self) -> Result<(), DispatchError>;

    /// Short backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}

/// Rejects radii the spatial query cannot answer meaningfully.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidRequest`] unless `radius_km` is finite
/// and strictly positive.
pub fn validate_radius(radius_km: f64) -> Result<(), DispatchError> {
    if radius_km.is_finite() && radius_km > 0.0 {
        Ok(())
    } else {
        Err(DispatchError::InvalidRequest(format!(
            "radius must be a positive number of kilometres, got {radius_km}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_must_be_positive_and_finite() {
        assert!(validate_radius(5.0).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(-1.0).is_err());
        assert!(validate_radius(f64::NAN).is_err());
    }
}
