//! System endpoints: health check and service-area lookup.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::LatLngQuery;
use crate::app_state::AppState;
use crate::domain::find_zone;
use crate::error::{DispatchError, ErrorResponse};

/// Reachability of one backing component.
#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentHealth {
    /// Implementation in use (`redis`, `postgres`, `memory`).
    pub backend: &'static str,
    /// Whether the last ping succeeded.
    pub reachable: bool,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Current server time.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_secs: u64,
    /// Driver index.
    pub driver_index: ComponentHealth,
    /// System of record.
    pub ride_store: ComponentHealth,
    /// Background tasks still running.
    pub background_tasks: usize,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns version, uptime and whether the driver index and system of record answer. Responds 503 when either is unreachable.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "A dependency is unreachable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let index = state.locations.index();
    let (index_ping, store_ping) = tokio::join!(index.ping(), state.store.ping());

    let driver_index = ComponentHealth {
        backend: index.backend_name(),
        reachable: index_ping.is_ok(),
    };
    let ride_store = ComponentHealth {
        backend: state.store.backend_name(),
        reachable: store_ping.is_ok(),
    };
    let healthy = driver_index.reachable && ride_store.reachable;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.started_at.elapsed().as_secs(),
            driver_index,
            ride_store,
            background_tasks: state.tasks.in_flight(),
        }),
    )
}

/// Service-area lookup response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAreaResponse {
    /// Whether the point lies in a served zone.
    pub is_available: bool,
    /// Matching zone name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Human-readable explanation.
    pub message: String,
}

/// `GET /service-area` — Whether the service operates at a point.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidCoordinate`] for a bad point.
#[utoipa::path(
    get,
    path = "/api/v1/service-area",
    tag = "System",
    summary = "Service availability",
    params(LatLngQuery),
    responses(
        (status = 200, description = "Availability at the point", body = ServiceAreaResponse),
        (status = 400, description = "Invalid coordinate", body = ErrorResponse),
    )
)]
pub async fn service_area_handler(
    State(state): State<AppState>,
    Query(query): Query<LatLngQuery>,
) -> Result<Json<ServiceAreaResponse>, DispatchError> {
    let point = query.coordinate()?;
    let zones = &state.config.service_zones;

    let response = match find_zone(zones, &point) {
        Some(zone) => ServiceAreaResponse {
            is_available: true,
            zone: Some(zone.name.clone()),
            message: format!("Service is available in your area ({})", zone.name),
        },
        None => {
            let cities: Vec<&str> = zones.iter().map(|z| z.name.as_str()).collect();
            ServiceAreaResponse {
                is_available: false,
                zone: None,
                message: format!("Service not available. We operate in: {}", cities.join(", ")),
            }
        }
    };
    Ok(Json(response))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// System routes mounted under /api/v1.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/service-area", get(service_area_handler))
}
