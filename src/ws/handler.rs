//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// Largest client frame accepted; heartbeats and room joins are tiny.
const MAX_CLIENT_MESSAGE_BYTES: usize = 16 * 1024;

/// `GET /ws` — Upgrade to the realtime channel used by driver and rider apps.
///
/// The event bus subscription is taken before the upgrade so that no room
/// event emitted during the handshake is missed.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe();
    tracing::trace!(subscribers = state.event_bus.receiver_count(), "realtime upgrade");

    ws.max_message_size(MAX_CLIENT_MESSAGE_BYTES)
        .on_upgrade(move |socket| run_connection(socket, event_rx, state))
}
