//! Per-connection room membership.
//!
//! Tracks which rooms a WebSocket connection joined, keeps the
//! [`EventBus`] presence counts in step, and provides server-side event
//! filtering.

use std::collections::HashSet;

use crate::domain::{EventBus, Room};

/// Rooms joined by a single WebSocket connection.
#[derive(Debug, Default)]
pub struct RoomMembership {
    rooms: HashSet<Room>,
}

impl RoomMembership {
    /// Creates an empty membership.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins `room`, registering presence on the bus the first time.
    ///
    /// Returns `true` if the room was newly joined.
    pub fn join(&mut self, room: Room, event_bus: &EventBus) -> bool {
        let joined = self.rooms.insert(room);
        if joined {
            event_bus.join(room);
        }
        joined
    }

    /// Returns `true` if events for `room` should be forwarded.
    #[must_use]
    pub fn contains(&self, room: Room) -> bool {
        self.rooms.contains(&room)
    }

    /// Number of joined rooms.
    #[must_use]
    pub fn count(&self) -> usize {
        self.rooms.len()
    }

    /// Leaves every room and returns them.
    pub fn leave_all(&mut self, event_bus: &EventBus) -> Vec<Room> {
        let rooms: Vec<Room> = self.rooms.drain().collect();
        for room in &rooms {
            event_bus.leave(*room);
        }
        rooms
    }
}
