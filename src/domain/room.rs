//! Realtime room addressing.
//!
//! A room reaches every active connection of one party: a driver's
//! connections join `driver:<id>`, a rider's connections join the bare
//! rider identifier.

use std::fmt;

use super::{DriverId, RiderId};

/// Addressable group of realtime connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// All sessions of one driver.
    Driver(DriverId),
    /// All sessions of one rider.
    Rider(RiderId),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(id) => write!(f, "driver:{id}"),
            Self::Rider(id) => write!(f, "{id}"),
        }
    }
}
