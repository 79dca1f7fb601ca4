//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming client events and forwarding room events for the
//! rooms this connection joined.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{ClientEvent, ClientRole, JoinUserRoom, LocationUpdate, NearbyRequest};
use super::subscription::RoomMembership;
use crate::app_state::AppState;
use crate::domain::{Coordinate, DriverId, DriverPosition, Room, RoomEvent, ServerEvent, SessionId};
use crate::error::DispatchError;

/// State owned by one connection.
#[derive(Debug)]
struct Session {
    id: SessionId,
    rooms: RoomMembership,
    /// Drivers that reported a position through this connection.
    drivers: HashSet<DriverId>,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads client events and answers the ones that have a direct reply.
/// - Forwards [`RoomEvent`]s for joined rooms from the [`broadcast::Receiver`].
/// - On close, leaves every room and drops driver positions this session
///   still owns.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<RoomEvent>,
    state: AppState,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut session = Session {
        id: SessionId::new(),
        rooms: RoomMembership::new(),
        drivers: HashSet::new(),
    };
    tracing::debug!(session_id = %session.id, "ws connection opened");

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut session, &state).await;
                        if let Some(event) = reply
                            && ws_tx.send(Message::text(event.to_json())).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session.id, error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(room_event) => {
                        if session.rooms.contains(room_event.room)
                            && ws_tx.send(Message::text(room_event.event.to_json())).await.is_err() {
                                break;
                            }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(session_id = %session.id, lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    close_session(session, &state).await;
}

/// Handles a text frame, returning the event to send back, if any.
async fn handle_text_message(
    text: &str,
    session: &mut Session,
    state: &AppState,
) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            return Some(error_event(&DispatchError::InvalidRequest(format!(
                "malformed message: {e}"
            ))));
        }
    };

    let result = match event {
        ClientEvent::LocationUpdate(update) => on_location_update(update, session, state).await,
        ClientEvent::JoinUserRoom(JoinUserRoom { user_id }) => {
            if session.rooms.join(Room::Rider(user_id), &state.event_bus) {
                tracing::info!(session_id = %session.id, rider_id = %user_id, "rider joined room");
            }
            Ok(None)
        }
        ClientEvent::RequestRide(request) => on_nearby_request(request, state).await.map(Some),
    };

    result.unwrap_or_else(|e| Some(error_event(&e)))
}

async fn on_location_update(
    update: LocationUpdate,
    session: &mut Session,
    state: &AppState,
) -> Result<Option<ServerEvent>, DispatchError> {
    if update.role != ClientRole::Driver {
        return Err(DispatchError::InvalidRequest(
            "locationUpdate is only accepted from drivers".to_string(),
        ));
    }
    let coordinate = Coordinate::new(update.latitude, update.longitude)?;
    let driver_id = update.driver_id;

    session.rooms.join(Room::Driver(driver_id), &state.event_bus);
    session.drivers.insert(driver_id);

    let position = DriverPosition::new(driver_id, coordinate, Some(session.id))
        .with_motion(update.heading, update.speed);
    state.locations.heartbeat(position).await?;

    if let Some(rider_id) = update.user_id {
        state
            .locations
            .relay_to_rider(driver_id, rider_id, coordinate, update.heading);
    }
    Ok(None)
}

async fn on_nearby_request(
    request: NearbyRequest,
    state: &AppState,
) -> Result<ServerEvent, DispatchError> {
    if request.role != ClientRole::User {
        return Err(DispatchError::InvalidRequest(
            "requestRide is only accepted from riders".to_string(),
        ));
    }
    let center = Coordinate::new(request.latitude, request.longitude)?;
    let drivers = state
        .locations
        .nearby(center, state.config.dispatch_radius_km)
        .await?;
    tracing::info!(rider_id = %request.user_id, found = drivers.len(), "nearby drivers requested");
    Ok(ServerEvent::NearbyDrivers { drivers })
}

async fn close_session(mut session: Session, state: &AppState) {
    session.rooms.leave_all(&state.event_bus);

    if state.config.remove_driver_on_disconnect {
        for driver_id in session.drivers.drain() {
            match state.locations.remove_if_owned(driver_id, session.id).await {
                Ok(true) => tracing::info!(%driver_id, "driver position removed on disconnect"),
                Ok(false) => {}
                Err(e) => tracing::warn!(%driver_id, error = %e, "disconnect cleanup failed"),
            }
        }
    }
    tracing::debug!(session_id = %session.id, "ws connection closed");
}

fn error_event(err: &DispatchError) -> ServerEvent {
    ServerEvent::Error {
        code: err.error_code(),
        message: err.to_string(),
    }
}
