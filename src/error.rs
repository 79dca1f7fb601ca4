//! Dispatch error types with HTTP status code mapping.
//!
//! [`DispatchError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{DriverId, RideId, RideStatus};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "route expired or unknown",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`DispatchError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                       |
/// |-----------|--------------------|-----------------------------------|
/// | 1000–1999 | Validation         | 400 Bad Request                   |
/// | 2000–2999 | State / Not Found  | 404 / 409 / 410                   |
/// | 3000–3999 | Server / Upstream  | 500 / 502 / 503                   |
/// | 4000–4999 | Account            | 403 Forbidden                     |
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Latitude/longitude is not a finite number or is out of range.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Route token was never issued or its quote has expired.
    ///
    /// The two cases are deliberately indistinguishable.
    #[error("this route has expired, please get a fresh estimate")]
    RouteExpiredOrUnknown,

    /// Another driver already accepted the ride.
    #[error("ride {0} was already taken by another driver")]
    RideAlreadyClaimed(RideId),

    /// The ride is not in the state the requested transition needs.
    #[error("ride {ride_id} cannot move to {to}: expected status {expected}")]
    InvalidTransition {
        /// Ride being transitioned.
        ride_id: RideId,
        /// Status the transition requires.
        expected: RideStatus,
        /// Requested target status.
        to: RideStatus,
    },

    /// No eligible driver was found near the pickup point.
    #[error("no eligible drivers near pickup for ride {0}")]
    NoEligibleDrivers(RideId),

    /// Ride with the given ID was not found.
    #[error("ride not found: {0}")]
    RideNotFound(RideId),

    /// Driver with the given ID was not found in the system of record.
    #[error("driver not found: {0}")]
    DriverNotFound(DriverId),

    /// Driver account is not approved, or is offline, for the operation.
    #[error("driver {driver_id} is not allowed to do this: {reason}")]
    DriverNotApproved {
        /// Driver attempting the operation.
        driver_id: DriverId,
        /// Why the driver is not allowed.
        reason: String,
    },

    /// Route planning collaborator could not produce a route.
    #[error("route unavailable: {0}")]
    RouteUnavailable(String),

    /// Spatial store, route cache, broker or system of record unreachable.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidCoordinate(_) => 1001,
            Self::InvalidRequest(_) => 1002,
            Self::RouteExpiredOrUnknown => 2001,
            Self::RideAlreadyClaimed(_) => 2002,
            Self::InvalidTransition { .. } => 2003,
            Self::NoEligibleDrivers(_) => 2004,
            Self::RideNotFound(_) => 2005,
            Self::DriverNotFound(_) => 2006,
            Self::Internal(_) => 3000,
            Self::UpstreamUnavailable(_) => 3001,
            Self::RouteUnavailable(_) => 3002,
            Self::DriverNotApproved { .. } => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCoordinate(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RouteExpiredOrUnknown => StatusCode::GONE,
            Self::RideAlreadyClaimed(_) | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::NoEligibleDrivers(_) | Self::RideNotFound(_) | Self::DriverNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::DriverNotApproved { .. } => StatusCode::FORBIDDEN,
            Self::RouteUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<redis::RedisError> for DispatchError {
    fn from(err: redis::RedisError) -> Self {
        Self::UpstreamUnavailable(format!("redis: {err}"))
    }
}

impl From<sqlx::Error> for DispatchError {
    fn from(err: sqlx::Error) -> Self {
        Self::UpstreamUnavailable(format!("database: {err}"))
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
