//! Circular service areas and the availability check.

use serde::Serialize;
use utoipa::ToSchema;

use super::Coordinate;

/// A named circle the service operates in.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ServiceZone {
    /// City or area name.
    pub name: String,
    /// Zone centre.
    pub center: Coordinate,
    /// Radius in kilometres.
    pub radius_km: f64,
}

impl ServiceZone {
    /// Whether `point` lies inside the zone (boundary inclusive).
    #[must_use]
    pub fn contains(&self, point: &Coordinate) -> bool {
        self.center.distance_km(point) <= self.radius_km
    }

    /// Parses `Name:Lat:Lng:RadiusKm;Name:Lat:Lng:RadiusKm;...`.
    ///
    /// Malformed entries are skipped.
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(';')
            .filter_map(|entry| {
                let mut parts = entry.split(':').map(str::trim);
                let name = parts.next().filter(|n| !n.is_empty())?;
                let lat = parts.next()?.parse().ok()?;
                let lng = parts.next()?.parse().ok()?;
                let radius_km: f64 = parts.next()?.parse().ok()?;
                let center = Coordinate::new(lat, lng).ok()?;
                (radius_km.is_finite() && radius_km > 0.0).then(|| Self {
                    name: name.to_string(),
                    center,
                    radius_km,
                })
            })
            .collect()
    }
}

/// Returns the first zone containing `point`, if any.
#[must_use]
pub fn find_zone<'a>(zones: &'a [ServiceZone], point: &Coordinate) -> Option<&'a ServiceZone> {
    zones.iter().find(|zone| zone.contains(point))
}
