//! Domain layer: identifiers, geometry, rides, drivers, quotes, and the
//! realtime event system.
//!
//! Everything here is plain data plus the in-process [`EventBus`]; no
//! type in this module performs network I/O.

pub mod driver;
pub mod event_bus;
pub mod geo;
pub mod ids;
pub mod realtime_event;
pub mod ride;
pub mod room;
pub mod route_quote;
pub mod service_zone;
pub mod vehicle;

pub use driver::{DriverAccount, DriverPosition, DriverStatus, EligibleDriver, NearbyDriver};
pub use event_bus::{EventBus, RoomEvent};
pub use geo::{Coordinate, EARTH_RADIUS_KM, haversine_km};
pub use ids::{DriverId, RideId, RiderId, SessionId};
pub use realtime_event::{
    LocationRelay, RideOffer, RideRequestEvent, RideStatusEvent, ServerEvent,
};
pub use ride::{NewRide, Ride, RideStatus, TransitionOutcome};
pub use room::Room;
pub use route_quote::{RouteQuote, RouteToken};
pub use service_zone::{ServiceZone, find_zone};
pub use vehicle::{Tariff, VehicleClass};
