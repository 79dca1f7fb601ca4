//! # ride-dispatch
//!
//! Real-time driver geolocation and ride dispatch over REST and WebSocket.
//!
//! Drivers stream position heartbeats into a geospatial index; riders get
//! a server-priced quote behind an opaque route token and book with it;
//! new rides are offered to nearby eligible drivers through push and
//! realtime rooms, and the first driver to accept wins.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── RideService / DriverService / LocationService (service/)
//!     ├── Fanout + dispatch relay ── RideRequestBroker (broker/)
//!     ├── EventBus rooms (domain/)
//!     │
//!     ├── DriverIndex (index/)          Redis GEO or in-memory
//!     ├── RouteCache (route_cache/)     Redis or in-memory
//!     ├── RoutePlanner (routing/)
//!     ├── PushNotifier (push/)          FCM or disabled
//!     └── RideStore (persistence/)      PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod broker;
pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod persistence;
pub mod push;
pub mod route_cache;
pub mod routing;
pub mod service;
pub mod ws;
