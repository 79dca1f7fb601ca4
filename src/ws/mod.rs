//! WebSocket layer: connection handling, message routing, rooms.
//!
//! The endpoint at `/ws` carries driver heartbeats and location relays,
//! rider nearby-driver requests, and server-pushed ride events addressed
//! to `driver:<id>` and rider rooms.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
