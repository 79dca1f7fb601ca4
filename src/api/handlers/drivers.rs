//! Driver handlers: heartbeat, availability, push token, ride status,
//! nearby search.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{
    AvailabilityRequest, LocationUpdateRequest, LocationUpdateResponse, MessageResponse,
    NearbyQuery, NearbyResponse, NotificationTokenRequest, RideStatusRequest,
};
use crate::app_state::AppState;
use crate::domain::{Coordinate, DriverAccount, DriverId, DriverPosition, Ride, RideId};
use crate::error::{DispatchError, ErrorResponse};

/// `PUT /drivers/{id}/location` — Driver heartbeat.
///
/// Idempotent: repeating the same heartbeat leaves one entry.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidCoordinate`] for a bad point or
/// [`DispatchError::UpstreamUnavailable`] if the index cannot be written.
#[utoipa::path(
    put,
    path = "/api/v1/drivers/{id}/location",
    tag = "Drivers",
    summary = "Driver heartbeat",
    params(
        ("id" = uuid::Uuid, Path, description = "Driver UUID"),
    ),
    request_body = LocationUpdateRequest,
    responses(
        (status = 200, description = "Heartbeat accepted", body = LocationUpdateResponse),
        (status = 400, description = "Invalid coordinate", body = ErrorResponse),
        (status = 503, description = "Index unavailable", body = ErrorResponse),
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(driver_id): Path<DriverId>,
    Json(req): Json<LocationUpdateRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    let coordinate = Coordinate::new(req.lat, req.lng)?;
    let position =
        DriverPosition::new(driver_id, coordinate, None).with_motion(req.heading, req.speed);
    let updated_at = position.updated_at;
    state.locations.heartbeat(position).await?;

    Ok(Json(LocationUpdateResponse {
        driver_id,
        updated_at,
    }))
}

/// `GET /drivers/{id}` — Driver account state.
///
/// # Errors
///
/// Returns [`DispatchError::DriverNotFound`] if the driver does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/drivers/{id}",
    tag = "Drivers",
    summary = "Get driver account",
    params(
        ("id" = uuid::Uuid, Path, description = "Driver UUID"),
    ),
    responses(
        (status = 200, description = "Driver account", body = DriverAccount),
        (status = 404, description = "Driver not found", body = ErrorResponse),
    )
)]
pub async fn get_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<DriverId>,
) -> Result<Json<DriverAccount>, DispatchError> {
    state.drivers.account(driver_id).await.map(Json)
}

/// `PUT /drivers/{id}/availability` — Go online or offline.
///
/// # Errors
///
/// Returns [`DispatchError::DriverNotApproved`] when a non-active driver
/// tries to go online, or [`DispatchError::DriverNotFound`].
#[utoipa::path(
    put,
    path = "/api/v1/drivers/{id}/availability",
    tag = "Drivers",
    summary = "Toggle availability",
    description = "Only active drivers may go online. Going offline also removes the live position.",
    params(
        ("id" = uuid::Uuid, Path, description = "Driver UUID"),
    ),
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Updated account", body = DriverAccount),
        (status = 403, description = "Driver not approved", body = ErrorResponse),
        (status = 404, description = "Driver not found", body = ErrorResponse),
    )
)]
pub async fn set_availability(
    State(state): State<AppState>,
    Path(driver_id): Path<DriverId>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<DriverAccount>, DispatchError> {
    state
        .drivers
        .set_availability(driver_id, req.online)
        .await
        .map(Json)
}

/// `PUT /drivers/{id}/notification-token` — Register the push device token.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidRequest`] for a blank token or
/// [`DispatchError::DriverNotFound`].
#[utoipa::path(
    put,
    path = "/api/v1/drivers/{id}/notification-token",
    tag = "Drivers",
    summary = "Register push token",
    params(
        ("id" = uuid::Uuid, Path, description = "Driver UUID"),
    ),
    request_body = NotificationTokenRequest,
    responses(
        (status = 200, description = "Token stored", body = MessageResponse),
        (status = 400, description = "Blank token", body = ErrorResponse),
        (status = 404, description = "Driver not found", body = ErrorResponse),
    )
)]
pub async fn register_notification_token(
    State(state): State<AppState>,
    Path(driver_id): Path<DriverId>,
    Json(req): Json<NotificationTokenRequest>,
) -> Result<Json<MessageResponse>, DispatchError> {
    state
        .drivers
        .register_push_token(driver_id, &req.token)
        .await?;
    Ok(Json(MessageResponse::new("notification token updated")))
}

/// `PUT /drivers/{id}/rides/{ride_id}/status` — Driver moves a ride forward.
///
/// # Errors
///
/// Returns [`DispatchError::RideAlreadyClaimed`] (409) when another driver
/// accepted first, [`DispatchError::InvalidTransition`] (409) for an
/// out-of-order change, [`DispatchError::DriverNotApproved`] (403) for an
/// offline or non-active driver, or a not-found error.
#[utoipa::path(
    put,
    path = "/api/v1/drivers/{id}/rides/{ride_id}/status",
    tag = "Drivers",
    summary = "Update ride status",
    description = "Accepted (from Requested, first driver wins), InProgress (from Accepted), Completed (from InProgress), Cancelled (from Accepted).",
    params(
        ("id" = uuid::Uuid, Path, description = "Driver UUID"),
        ("ride_id" = uuid::Uuid, Path, description = "Ride UUID"),
    ),
    request_body = RideStatusRequest,
    responses(
        (status = 200, description = "Updated ride", body = Ride),
        (status = 403, description = "Driver not allowed", body = ErrorResponse),
        (status = 404, description = "Ride or driver not found", body = ErrorResponse),
        (status = 409, description = "Already taken or invalid transition", body = ErrorResponse),
    )
)]
pub async fn update_ride_status(
    State(state): State<AppState>,
    Path((driver_id, ride_id)): Path<(DriverId, RideId)>,
    Json(req): Json<RideStatusRequest>,
) -> Result<Json<Ride>, DispatchError> {
    state
        .rides
        .update_status(driver_id, ride_id, req.status)
        .await
        .map(Json)
}

/// `GET /drivers/nearby` — Drivers around a point, nearest first.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidCoordinate`] or
/// [`DispatchError::InvalidRequest`] for a non-positive radius.
#[utoipa::path(
    get,
    path = "/api/v1/drivers/nearby",
    tag = "Drivers",
    summary = "Nearby drivers",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Drivers ordered by distance", body = NearbyResponse),
        (status = 400, description = "Invalid coordinate or radius", body = ErrorResponse),
    )
)]
pub async fn nearby_drivers(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>, DispatchError> {
    let center = Coordinate::new(query.lat, query.lng)?;
    let radius_km = query.radius_km.unwrap_or(state.config.dispatch_radius_km);
    let drivers = state.locations.nearby(center, radius_km).await?;
    Ok(Json(NearbyResponse {
        count: drivers.len(),
        drivers,
    }))
}

/// Driver routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/drivers/nearby", get(nearby_drivers))
        .route("/drivers/{id}", get(get_driver))
        .route("/drivers/{id}/location", put(update_location))
        .route("/drivers/{id}/availability", put(set_availability))
        .route(
            "/drivers/{id}/notification-token",
            put(register_notification_token),
        )
        .route(
            "/drivers/{id}/rides/{ride_id}/status",
            put(update_ride_status),
        )
}
