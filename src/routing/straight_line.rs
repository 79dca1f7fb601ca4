//! Planner that estimates a route from the great-circle distance.
//!
//! Used when no external directions service is configured. Road distance is
//! approximated as `haversine * detour_factor` and travel time from a flat
//! average speed.

use async_trait::async_trait;

use super::{PlannedRoute, RoutePlanner, polyline};
use crate::domain::{Coordinate, VehicleClass, haversine_km};
use crate::error::DispatchError;

/// Pickup and drop-off closer than this are the same place.
const MIN_TRIP_KM: f64 = 0.01;

/// [`RoutePlanner`] based on haversine distance.
#[derive(Debug, Clone)]
pub struct StraightLinePlanner {
    average_speed_kmh: f64,
    detour_factor: f64,
}

impl StraightLinePlanner {
    /// Creates a planner; non-positive parameters are clamped to sane minimums.
    #[must_use]
    pub fn new(average_speed_kmh: f64, detour_factor: f64) -> Self {
        Self {
            average_speed_kmh: average_speed_kmh.max(1.0),
            detour_factor: detour_factor.max(1.0),
        }
    }
}

impl Default for StraightLinePlanner {
    fn default() -> Self {
        Self::new(25.0, 1.3)
    }
}

#[async_trait]
impl RoutePlanner for StraightLinePlanner {
    async fn plan_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        vehicle_class: VehicleClass,
    ) -> Result<PlannedRoute, DispatchError> {
        let direct_km = haversine_km(&origin, &destination);
        if direct_km < MIN_TRIP_KM {
            return Err(DispatchError::RouteUnavailable(
                "pickup and destination are the same place".to_string(),
            ));
        }

        let road_km = direct_km * self.detour_factor;
        let hours = road_km / self.average_speed_kmh;
        let distance_m = (road_km * 1000.0).round() as u32;
        let duration_s = (hours * 3600.0).round().max(1.0) as u32;

        tracing::debug!(
            vehicle_class = %vehicle_class,
            distance_m,
            duration_s,
            "planned straight-line route"
        );

        Ok(PlannedRoute {
            polyline: polyline::encode(&[origin, destination]),
            distance_m,
            duration_s,
            external_ref: None,
        })
    }
}
