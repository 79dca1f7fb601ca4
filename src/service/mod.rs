//! Service layer: business logic orchestration.
//!
//! [`RideService`] drives the ride lifecycle, [`DriverService`] keeps
//! account state and the index in step, [`LocationService`] fronts the
//! driver index for heartbeats and relays, and [`Fanout`] offers new rides
//! to nearby drivers. All of them depend on trait objects only, so the
//! binary picks Redis/PostgreSQL or in-memory collaborators at startup.

pub mod driver_service;
pub mod fanout;
pub mod location_service;
pub mod ride_service;
pub mod tasks;

pub use driver_service::DriverService;
pub use fanout::{Fanout, relay_ride_request, run_dispatch_relay};
pub use location_service::LocationService;
pub use ride_service::{
    CreatedRide, EstimateRequest, RideDeps, RideService, RideSettings, RouteEstimate,
};
pub use tasks::BackgroundTasks;
