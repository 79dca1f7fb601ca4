//! Shared harness: the real application on an ephemeral port with
//! in-memory collaborators.

#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use ride_dispatch::api::build_app;
use ride_dispatch::app_state::{AppState, Collaborators};
use ride_dispatch::config::DispatchConfig;
use ride_dispatch::domain::{DriverAccount, DriverId, DriverStatus, VehicleClass};
use ride_dispatch::error::DispatchError;
use ride_dispatch::persistence::{InMemoryRideStore, RideStore};
use ride_dispatch::push::{PushNotification, PushNotifier};

/// Client side of a test WebSocket.
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push notifier that keeps every notification it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<(Vec<String>, PushNotification)>>,
}

impl RecordingPush {
    /// Device tokens that received a push whose `type` is `kind`.
    pub fn tokens_for(&self, kind: &str) -> Vec<String> {
        let Ok(sent) = self.sent.lock() else {
            panic!("push log poisoned");
        };
        sent.iter()
            .filter(|(_, n)| n.data.get("type").map(String::as_str) == Some(kind))
            .flat_map(|(tokens, _)| tokens.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl PushNotifier for RecordingPush {
    async fn notify(
        &self,
        tokens: &[String],
        notification: &PushNotification,
    ) -> Result<(), DispatchError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((tokens.to_vec(), notification.clone()));
        }
        Ok(())
    }
}

/// A running server and handles into its state.
#[derive(Debug)]
pub struct TestServer {
    /// `http://127.0.0.1:<port>`.
    pub base: String,
    /// Shared state, for background-task inspection.
    pub state: AppState,
    /// The in-memory system of record, for seeding.
    pub store: Arc<InMemoryRideStore>,
    /// Every push the server sent.
    pub pushes: Arc<RecordingPush>,
    /// HTTP client.
    pub http: reqwest::Client,
    server: JoinHandle<()>,
    relay: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
        self.relay.abort();
    }
}

/// Starts a server with default configuration adjusted by `tweak`.
pub async fn spawn_server(tweak: impl FnOnce(&mut DispatchConfig)) -> TestServer {
    let Ok(mut config) = DispatchConfig::from_lookup(|_| None) else {
        panic!("default configuration must load");
    };
    tweak(&mut config);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };

    let store = Arc::new(InMemoryRideStore::new());
    let mut collaborators = Collaborators::in_memory(&config);
    let pushes = Arc::new(RecordingPush::default());
    collaborators.store = Arc::clone(&store) as Arc<dyn RideStore>;
    collaborators.notifier = Arc::clone(&pushes) as Arc<dyn PushNotifier>;

    let state = AppState::new(config, collaborators);
    let relay = state.spawn_dispatch_relay();
    let app = build_app(state.clone());
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        base: format!("http://{addr}"),
        state,
        store,
        pushes,
        http: reqwest::Client::new(),
        server,
        relay,
    }
}

impl TestServer {
    /// Absolute URL of `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Seeds an online, active driver with a push token.
    pub async fn seed_driver(&self, vehicle_class: VehicleClass) -> DriverId {
        let id = DriverId::new();
        self.store
            .upsert_driver(DriverAccount {
                id,
                name: "Test Driver".to_string(),
                vehicle_class,
                status: DriverStatus::Active,
                is_online: true,
                notification_token: Some(format!("device-{id}")),
            })
            .await;
        id
    }

    /// Sends a JSON request and returns status and body.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> (u16, Value) {
        let Ok(response) = request.send().await else {
            panic!("request failed");
        };
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// `PUT /api/v1/drivers/{id}/location`.
    pub async fn heartbeat(&self, driver: DriverId, lat: f64, lng: f64) -> (u16, Value) {
        self.send(
            self.http
                .put(self.url(&format!("/api/v1/drivers/{driver}/location")))
                .json(&serde_json::json!({ "lat": lat, "lng": lng })),
        )
        .await
    }

    /// Estimates a Car ride between two fixed Bengaluru points and returns
    /// the route token.
    pub async fn estimate(&self) -> String {
        let (status, body) = self
            .send(
                self.http
                    .post(self.url("/api/v1/rides/estimate"))
                    .json(&serde_json::json!({
                        "origin": { "latitude": 12.93, "longitude": 77.61, "name": "Koramangala" },
                        "destination": { "latitude": 12.97, "longitude": 77.59, "name": "MG Road" },
                        "vehicleClass": "Car",
                    })),
            )
            .await;
        assert_eq!(status, 200, "estimate failed: {body}");
        let Some(token) = body["routeToken"].as_str() else {
            panic!("routeToken missing in {body}");
        };
        token.to_string()
    }

    /// Driver ids currently returned by `GET /api/v1/drivers/nearby`.
    pub async fn nearby_ids(&self, lat: f64, lng: f64) -> Vec<String> {
        let (_, body) = self
            .send(
                self.http
                    .get(self.url(&format!("/api/v1/drivers/nearby?lat={lat}&lng={lng}"))),
            )
            .await;
        body["drivers"]
            .as_array()
            .map(|drivers| {
                drivers
                    .iter()
                    .filter_map(|d| d["driverId"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Opens a WebSocket to `/ws`.
    pub async fn connect_ws(&self) -> WsClient {
        let url = format!("{}/ws", self.base.replacen("http", "ws", 1));
        let Ok((ws, _)) = tokio_tungstenite::connect_async(url).await else {
            panic!("ws connect failed");
        };
        ws
    }
}

/// Sends one `{"event", "data"}` frame.
pub async fn send_event(ws: &mut WsClient, event: &str, data: Value) {
    let frame = serde_json::json!({ "event": event, "data": data }).to_string();
    if ws.send(Message::text(frame)).await.is_err() {
        panic!("ws send failed");
    }
}

/// Reads frames until one named `event` arrives, or panics after 5 s.
pub async fn expect_event(ws: &mut WsClient, event: &str) -> Value {
    let wait = async {
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message
                && let Ok(value) = serde_json::from_str::<Value>(text.as_str())
                && value["event"] == event
            {
                return Some(value["data"].clone());
            }
        }
        None
    };
    match tokio::time::timeout(Duration::from_secs(5), wait).await {
        Ok(Some(data)) => data,
        _ => panic!("no {event} event received"),
    }
}

/// Reads frames for `window` and panics if one named `event` arrives.
pub async fn expect_no_event(ws: &mut WsClient, event: &str, window: Duration) {
    let watch = async {
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message
                && let Ok(value) = serde_json::from_str::<Value>(text.as_str())
                && value["event"] == event
            {
                return Some(value);
            }
        }
        None
    };
    if let Ok(Some(frame)) = tokio::time::timeout(window, watch).await {
        panic!("unexpected {event} event: {frame}");
    }
}

/// Polls `check` until it holds, for up to 2 s.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
