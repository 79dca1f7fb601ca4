//! In-process broadcast bus for realtime room events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every event is
//! addressed to a [`Room`]; each WebSocket connection subscribes once and
//! forwards only the events for rooms it has joined. The bus also keeps a
//! count of local members per room, so emitting to a room nobody on this
//! process has joined is a cheap no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use super::{Room, ServerEvent};

/// An event addressed to one room.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    /// Destination room.
    pub room: Room,
    /// Payload delivered to every member connection.
    pub event: ServerEvent,
}

/// Broadcast bus for [`RoomEvent`]s with local room presence.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers; nothing is buffered for rooms without
/// members.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RoomEvent>,
    members: Arc<Mutex<HashMap<Room, usize>>>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            members: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Emits `event` to every local connection that joined `room`.
    ///
    /// Returns `false` without publishing when no local connection is a
    /// member of the room.
    pub fn emit(&self, room: Room, event: ServerEvent) -> bool {
        if !self.has_members(room) {
            return false;
        }
        self.sender.send(RoomEvent { room, event }).is_ok()
    }

    /// Creates a new receiver that will receive all future events.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }

    /// Records that one more local connection joined `room`.
    pub fn join(&self, room: Room) {
        let mut members = self.members.lock().unwrap_or_else(PoisonError::into_inner);
        *members.entry(room).or_insert(0) += 1;
    }

    /// Records that one local connection left `room`.
    pub fn leave(&self, room: Room) {
        let mut members = self.members.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = members.get_mut(&room) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                members.remove(&room);
            }
        }
    }

    /// Returns `true` if at least one local connection joined `room`.
    #[must_use]
    pub fn has_members(&self, room: Room) -> bool {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&room)
            .is_some_and(|count| *count > 0)
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
