//! Data Transfer Objects for REST request/response serialization.
//!
//! Coordinates arrive as raw numbers and are validated in the handlers so
//! a bad point maps to `InvalidCoordinate` (400) instead of a body
//! rejection.

pub mod common_dto;
pub mod driver_dto;
pub mod ride_dto;

pub use common_dto::*;
pub use driver_dto::*;
pub use ride_dto::*;
