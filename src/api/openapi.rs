//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::handlers::{admin, drivers, rides, system};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI 3 document.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "ride-dispatch",
        description = "Real-time driver geolocation and ride dispatch. Realtime events are served over the WebSocket at /ws."
    ),
    paths(
        rides::estimate_ride,
        rides::create_ride,
        rides::get_ride,
        rides::cancel_ride,
        rides::driver_location,
        drivers::update_location,
        drivers::get_driver,
        drivers::set_availability,
        drivers::register_notification_token,
        drivers::update_ride_status,
        drivers::nearby_drivers,
        admin::update_driver_status,
        system::health_handler,
        system::service_area_handler,
    ),
    components(schemas(ErrorResponse, ErrorBody)),
    tags(
        (name = "Rides", description = "Estimate, book and cancel rides"),
        (name = "Drivers", description = "Heartbeats, availability and ride progress"),
        (name = "Admin", description = "Driver account administration"),
        (name = "System", description = "Health and service area"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_dispatch_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/rides",
            "/api/v1/rides/estimate",
            "/api/v1/drivers/{id}/location",
            "/api/v1/drivers/{id}/rides/{ride_id}/status",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
