//! REST integration tests against a live server with in-memory backends.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use serde_json::json;

use common::{eventually, spawn_server};
use ride_dispatch::domain::{DriverId, RiderId, VehicleClass};

#[tokio::test]
async fn health_reports_healthy_with_memory_backends() {
    let server = spawn_server(|_| {}).await;
    let (status, body) = server.send(server.http.get(server.url("/health"))).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["driver_index"]["backend"], "memory");
    assert_eq!(body["ride_store"]["reachable"], true);
}

#[tokio::test]
async fn estimate_then_book_dispatches_to_nearby_driver() {
    let server = spawn_server(|_| {}).await;
    let driver = server.seed_driver(VehicleClass::Car).await;
    let (status, _) = server.heartbeat(driver, 12.931, 77.611).await;
    assert_eq!(status, 200);

    let token = server.estimate().await;
    let rider = RiderId::new();
    let (status, body) = server
        .send(
            server
                .http
                .post(server.url("/api/v1/rides"))
                .json(&json!({ "routeToken": token, "riderId": rider })),
        )
        .await;

    assert_eq!(status, 201, "{body}");
    assert_eq!(body["status"], "Requested");
    assert_eq!(body["nearbyDriverCount"], 1);
    assert!(body["fare"].as_f64().unwrap_or_default() > 0.0);

    let Some(ride_id) = body["rideId"].as_str() else {
        panic!("rideId missing");
    };
    let (status, ride) = server
        .send(server.http.get(server.url(&format!("/api/v1/rides/{ride_id}"))))
        .await;
    assert_eq!(status, 200);
    assert_eq!(ride["status"], "Requested");
    assert_eq!(ride["originName"], "Koramangala");
}

#[tokio::test]
async fn unknown_or_malformed_token_is_gone() {
    let server = spawn_server(|_| {}).await;

    for token in ["not-a-token", "8f14e45fceea4e0f9d1b6c3a2b7d5e91"] {
        let (status, body) = server
            .send(
                server
                    .http
                    .post(server.url("/api/v1/rides"))
                    .json(&json!({ "routeToken": token, "riderId": RiderId::new() })),
            )
            .await;
        assert_eq!(status, 410, "token {token}");
        assert_eq!(body["error"]["code"], 2001);
    }
}

#[tokio::test]
async fn expired_quote_cannot_be_booked() {
    let server = spawn_server(|c| c.route_quote_ttl = Duration::from_millis(50)).await;
    let token = server.estimate().await;

    tokio::time::sleep(Duration::from_millis(150)).await;

    let (status, body) = server
        .send(
            server
                .http
                .post(server.url("/api/v1/rides"))
                .json(&json!({ "routeToken": token, "riderId": RiderId::new() })),
        )
        .await;
    assert_eq!(status, 410);
    assert_eq!(body["error"]["code"], 2001);
}

#[tokio::test]
async fn heartbeat_with_invalid_coordinate_is_rejected() {
    let server = spawn_server(|_| {}).await;
    let driver = server.seed_driver(VehicleClass::Bike).await;

    let (status, body) = server.heartbeat(driver, 91.0, 77.6).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], 1001);

    assert!(server.nearby_ids(12.93, 77.61).await.is_empty());
}

#[tokio::test]
async fn nearby_returns_driver_with_distance() {
    let server = spawn_server(|_| {}).await;
    let driver = server.seed_driver(VehicleClass::Car).await;
    let (status, _) = server.heartbeat(driver, 12.93, 77.61).await;
    assert_eq!(status, 200);

    let (status, body) = server
        .send(
            server
                .http
                .get(server.url("/api/v1/drivers/nearby?lat=12.931&lng=77.615&radiusKm=5")),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["drivers"][0]["driverId"], driver.to_string());
    let distance = body["drivers"][0]["distanceKm"].as_f64().unwrap_or(f64::MAX);
    assert!(distance < 1.0, "distance {distance}");
}

#[tokio::test]
async fn going_offline_removes_driver_from_nearby() {
    let server = spawn_server(|_| {}).await;
    let driver = server.seed_driver(VehicleClass::Car).await;
    server.heartbeat(driver, 12.93, 77.61).await;
    assert_eq!(server.nearby_ids(12.93, 77.61).await, vec![driver.to_string()]);

    let (status, _) = server
        .send(
            server
                .http
                .put(server.url(&format!("/api/v1/drivers/{driver}/availability")))
                .json(&json!({ "online": false })),
        )
        .await;
    assert_eq!(status, 200);
    assert!(server.nearby_ids(12.93, 77.61).await.is_empty());
}

#[tokio::test]
async fn only_one_driver_wins_the_accept_race() {
    let server = spawn_server(|_| {}).await;
    let first = server.seed_driver(VehicleClass::Car).await;
    let second = server.seed_driver(VehicleClass::Car).await;

    let token = server.estimate().await;
    let (_, body) = server
        .send(
            server
                .http
                .post(server.url("/api/v1/rides"))
                .json(&json!({ "routeToken": token, "riderId": RiderId::new() })),
        )
        .await;
    let Some(ride_id) = body["rideId"].as_str().map(str::to_string) else {
        panic!("rideId missing in {body}");
    };

    let accept = |driver: DriverId| {
        server.send(
            server
                .http
                .put(server.url(&format!("/api/v1/drivers/{driver}/rides/{ride_id}/status")))
                .json(&json!({ "status": "Accepted" })),
        )
    };
    let (a, b) = tokio::join!(accept(first), accept(second));

    let mut statuses = [a.0, b.0];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 409]);
    let loser = if a.0 == 409 { a.1 } else { b.1 };
    assert_eq!(loser["error"]["code"], 2002);
    assert!(
        loser["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("already taken"))
    );

    let (_, ride) = server
        .send(server.http.get(server.url(&format!("/api/v1/rides/{ride_id}"))))
        .await;
    assert_eq!(ride["status"], "Accepted");
    let winner = ride["driverId"].as_str().map(str::to_string);
    assert!(winner == Some(first.to_string()) || winner == Some(second.to_string()));
}

#[tokio::test]
async fn rider_cancels_and_cannot_cancel_twice() {
    let server = spawn_server(|_| {}).await;
    let token = server.estimate().await;
    let rider = RiderId::new();
    let (_, body) = server
        .send(
            server
                .http
                .post(server.url("/api/v1/rides"))
                .json(&json!({ "routeToken": token, "riderId": rider })),
        )
        .await;
    let Some(ride_id) = body["rideId"].as_str().map(str::to_string) else {
        panic!("rideId missing in {body}");
    };
    let cancel_url = server.url(&format!("/api/v1/rides/{ride_id}/cancel"));

    let (status, _) = server
        .send(
            server
                .http
                .post(&cancel_url)
                .json(&json!({ "riderId": RiderId::new() })),
        )
        .await;
    assert_eq!(status, 404, "a different rider must not see the ride");

    let (status, ride) = server
        .send(
            server
                .http
                .post(&cancel_url)
                .json(&json!({ "riderId": rider, "reason": "changed plans" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(ride["status"], "Cancelled");
    assert_eq!(ride["cancelReason"], "changed plans");

    let (status, body) = server
        .send(server.http.post(&cancel_url).json(&json!({ "riderId": rider })))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], 2003);
}

#[tokio::test]
async fn suspended_driver_cannot_go_online() {
    let server = spawn_server(|_| {}).await;
    let driver = server.seed_driver(VehicleClass::Auto).await;
    server.heartbeat(driver, 12.93, 77.61).await;

    let (status, _) = server
        .send(
            server
                .http
                .put(server.url(&format!("/api/v1/admin/drivers/{driver}/status")))
                .json(&json!({ "status": "suspended" })),
        )
        .await;
    assert_eq!(status, 200);
    assert!(
        eventually(|| async { server.nearby_ids(12.93, 77.61).await.is_empty() }).await,
        "suspension must drop the position"
    );

    let (status, body) = server
        .send(
            server
                .http
                .put(server.url(&format!("/api/v1/drivers/{driver}/availability")))
                .json(&json!({ "online": true })),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], 4001);
}

#[tokio::test]
async fn service_area_matches_configured_cities() {
    let server = spawn_server(|_| {}).await;

    let (status, body) = server
        .send(server.http.get(server.url("/api/v1/service-area?lat=13.0827&lng=80.2707")))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["isAvailable"], true);
    assert_eq!(body["zone"], "Chennai");

    let (status, body) = server
        .send(server.http.get(server.url("/api/v1/service-area?lat=0&lng=0")))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["isAvailable"], false);
    assert!(body.get("zone").is_none());
}
