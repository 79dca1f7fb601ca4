//! Administrative endpoints.

use axum::extract::{Path, State};
use axum::routing::put;
use axum::{Json, Router};

use crate::api::dto::DriverStatusRequest;
use crate::app_state::AppState;
use crate::domain::{DriverAccount, DriverId};
use crate::error::{DispatchError, ErrorResponse};

/// `PUT /admin/drivers/{id}/status` — Approve, suspend or reject a driver.
///
/// # Errors
///
/// Returns [`DispatchError::DriverNotFound`] if the driver does not exist.
#[utoipa::path(
    put,
    path = "/api/v1/admin/drivers/{id}/status",
    tag = "Admin",
    summary = "Set driver account status",
    description = "Any status other than active forces the driver offline and removes the live position.",
    params(
        ("id" = uuid::Uuid, Path, description = "Driver UUID"),
    ),
    request_body = DriverStatusRequest,
    responses(
        (status = 200, description = "Updated account", body = DriverAccount),
        (status = 404, description = "Driver not found", body = ErrorResponse),
    )
)]
pub async fn update_driver_status(
    State(state): State<AppState>,
    Path(driver_id): Path<DriverId>,
    Json(req): Json<DriverStatusRequest>,
) -> Result<Json<DriverAccount>, DispatchError> {
    state
        .drivers
        .set_account_status(driver_id, req.status)
        .await
        .map(Json)
}

/// Admin routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/drivers/{id}/status", put(update_driver_status))
}
