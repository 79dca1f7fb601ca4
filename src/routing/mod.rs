//! Route planning collaborator.
//!
//! Ride estimation asks a [`RoutePlanner`] for the road route between two
//! points and treats the result as opaque: the polyline is forwarded to the
//! client and the distance and duration feed the tariff.

pub mod polyline;
pub mod straight_line;

use std::fmt;

use async_trait::async_trait;

pub use self::straight_line::StraightLinePlanner;
use crate::domain::{Coordinate, VehicleClass};
use crate::error::DispatchError;

/// Route geometry and travel estimates returned by a planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    /// Encoded polyline of the route.
    pub polyline: String,
    /// Road distance in metres.
    pub distance_m: u32,
    /// Travel time in seconds.
    pub duration_s: u32,
    /// Planner-specific route reference, if any.
    pub external_ref: Option<String>,
}

/// Computes a route between two points for a vehicle class.
#[async_trait]
pub trait RoutePlanner: Send + Sync + fmt::Debug {
    /// Plans a route from `origin` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RouteUnavailable`] if no route can be
    /// produced.
    async fn plan_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        vehicle_class: VehicleClass,
    ) -> Result<PlannedRoute, DispatchError>;
}
