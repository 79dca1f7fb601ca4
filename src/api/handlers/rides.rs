//! Rider-facing ride handlers: estimate, create, get, cancel, driver location.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CancelRideRequest, CreateRideRequest, CreateRideResponse, DriverLocationResponse,
    EstimateRideRequest, EstimateRideResponse, RiderQuery,
};
use crate::app_state::AppState;
use crate::domain::{Ride, RideId, RouteToken};
use crate::error::{DispatchError, ErrorResponse};
use crate::service::EstimateRequest;

/// `POST /rides/estimate` — Plan and price a trip.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidCoordinate`] for a bad point,
/// [`DispatchError::RouteUnavailable`] if no route can be planned, or
/// [`DispatchError::UpstreamUnavailable`] if the quote cannot be cached.
#[utoipa::path(
    post,
    path = "/api/v1/rides/estimate",
    tag = "Rides",
    summary = "Estimate a ride",
    description = "Plans the route, prices it for the vehicle class and caches the quote. The returned token is the only thing the client sends back to book.",
    request_body = EstimateRideRequest,
    responses(
        (status = 200, description = "Priced quote", body = EstimateRideResponse),
        (status = 400, description = "Invalid coordinate", body = ErrorResponse),
        (status = 502, description = "Route unavailable", body = ErrorResponse),
    )
)]
pub async fn estimate_ride(
    State(state): State<AppState>,
    Json(req): Json<EstimateRideRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    let estimate = state
        .rides
        .estimate(EstimateRequest {
            origin: req.origin.coordinate()?,
            destination: req.destination.coordinate()?,
            origin_name: req.origin.display_name(),
            destination_name: req.destination.display_name(),
            vehicle_class: req.vehicle_class,
        })
        .await?;

    Ok(Json(EstimateRideResponse {
        route_token: estimate.token,
        polyline: estimate.quote.polyline,
        distance_meters: estimate.quote.distance_m,
        duration_seconds: estimate.quote.duration_s,
        fare: estimate.quote.fare,
        vehicle_class: estimate.quote.vehicle_class,
        expires_in_secs: estimate.expires_in_secs,
    }))
}

/// `POST /rides` — Book a ride from a route token.
///
/// # Errors
///
/// Returns [`DispatchError::RouteExpiredOrUnknown`] (410) for an unknown,
/// malformed or expired token, or [`DispatchError::InvalidRequest`] on a
/// vehicle class mismatch.
#[utoipa::path(
    post,
    path = "/api/v1/rides",
    tag = "Rides",
    summary = "Create a ride",
    description = "Creates the ride from the cached quote and dispatches it to nearby eligible drivers in the background. Succeeds even when no driver is found.",
    request_body = CreateRideRequest,
    responses(
        (status = 201, description = "Ride created", body = CreateRideResponse),
        (status = 400, description = "Vehicle class mismatch", body = ErrorResponse),
        (status = 410, description = "Route expired or unknown", body = ErrorResponse),
    )
)]
pub async fn create_ride(
    State(state): State<AppState>,
    Json(req): Json<CreateRideRequest>,
) -> Result<impl IntoResponse, DispatchError> {
    let token: RouteToken = req
        .route_token
        .trim()
        .parse()
        .map_err(|_| DispatchError::RouteExpiredOrUnknown)?;

    let created = state
        .rides
        .create_ride(token, req.rider_id, req.vehicle_class)
        .await?;

    let response = CreateRideResponse {
        ride_id: created.ride.id,
        status: created.ride.status,
        fare: created.ride.fare,
        nearby_driver_count: created.nearby_driver_count,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /rides/{id}` — Ride details.
///
/// # Errors
///
/// Returns [`DispatchError::RideNotFound`] if the ride does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/rides/{id}",
    tag = "Rides",
    summary = "Get ride details",
    params(
        ("id" = uuid::Uuid, Path, description = "Ride UUID"),
    ),
    responses(
        (status = 200, description = "Ride", body = Ride),
        (status = 404, description = "Ride not found", body = ErrorResponse),
    )
)]
pub async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<RideId>,
) -> Result<Json<Ride>, DispatchError> {
    state.rides.ride(id).await.map(Json)
}

/// `POST /rides/{id}/cancel` — Rider cancels a ride.
///
/// # Errors
///
/// Returns [`DispatchError::RideNotFound`] if the ride does not belong to
/// the rider, or [`DispatchError::InvalidTransition`] once it has started.
#[utoipa::path(
    post,
    path = "/api/v1/rides/{id}/cancel",
    tag = "Rides",
    summary = "Cancel a ride",
    description = "Allowed while the ride is Requested or Accepted. An assigned driver is notified.",
    params(
        ("id" = uuid::Uuid, Path, description = "Ride UUID"),
    ),
    request_body = CancelRideRequest,
    responses(
        (status = 200, description = "Cancelled ride", body = Ride),
        (status = 404, description = "Ride not found", body = ErrorResponse),
        (status = 409, description = "Ride can no longer be cancelled", body = ErrorResponse),
    )
)]
pub async fn cancel_ride(
    State(state): State<AppState>,
    Path(id): Path<RideId>,
    Json(req): Json<CancelRideRequest>,
) -> Result<Json<Ride>, DispatchError> {
    let reason = req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    state.rides.cancel(id, req.rider_id, reason).await.map(Json)
}

/// `GET /rides/{id}/driver-location` — Live position of the assigned driver.
///
/// # Errors
///
/// Returns [`DispatchError::RideNotFound`] or
/// [`DispatchError::DriverNotFound`] when no live position exists.
#[utoipa::path(
    get,
    path = "/api/v1/rides/{id}/driver-location",
    tag = "Rides",
    summary = "Assigned driver location",
    params(
        ("id" = uuid::Uuid, Path, description = "Ride UUID"),
        RiderQuery,
    ),
    responses(
        (status = 200, description = "Driver position", body = DriverLocationResponse),
        (status = 404, description = "Ride or driver position not found", body = ErrorResponse),
    )
)]
pub async fn driver_location(
    State(state): State<AppState>,
    Path(id): Path<RideId>,
    Query(query): Query<RiderQuery>,
) -> Result<impl IntoResponse, DispatchError> {
    let position = state
        .rides
        .assigned_driver_position(id, query.rider_id)
        .await?;
    Ok(Json(DriverLocationResponse {
        lat: position.coordinate.latitude,
        lng: position.coordinate.longitude,
        heading: position.heading,
        updated_at: position.updated_at,
    }))
}

/// Ride routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rides/estimate", post(estimate_ride))
        .route("/rides", post(create_ride))
        .route("/rides/{id}", get(get_ride))
        .route("/rides/{id}/cancel", post(cancel_ride))
        .route("/rides/{id}/driver-location", get(driver_location))
}
