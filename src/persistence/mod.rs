//! Persistence layer: the system of record for accounts and rides.
//!
//! Provides the [`RideStore`] trait consumed by the services. The concrete
//! implementations are [`PostgresRideStore`] (`sqlx::PgPool`) and
//! [`InMemoryRideStore`] for development and tests.
//!
//! The one concurrency-critical operation is
//! [`RideStore::transition_ride_status`]: a compare-and-swap on the ride's
//! status that decides which of several racing drivers wins a ride.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

pub use self::memory::InMemoryRideStore;
pub use self::postgres::PostgresRideStore;
use crate::domain::{
    DriverAccount, DriverId, DriverStatus, EligibleDriver, NewRide, Ride, RideId, RideStatus,
    RiderId, Tariff, TransitionOutcome, VehicleClass,
};
use crate::error::DispatchError;

/// Durable store for driver accounts, rider push endpoints, tariffs and rides.
#[async_trait]
pub trait RideStore: Send + Sync + fmt::Debug {
    /// Batch eligibility filter: the subset of `candidates` that is online,
    /// active, registered for `vehicle_class` and has a push endpoint.
    ///
    /// One round-trip regardless of the candidate count.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] on store failure.
    async fn eligible_drivers(
        &self,
        candidates: &[DriverId],
        vehicle_class: VehicleClass,
    ) -> Result<Vec<EligibleDriver>, DispatchError>;

    /// Loads one driver account.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] on store failure.
    async fn driver_account(&self, driver_id: DriverId)
    -> Result<Option<DriverAccount>, DispatchError>;

    /// Sets the driver's online flag.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DriverNotFound`] for an unknown driver, or
    /// [`DispatchError::UpstreamUnavailable`].
    async fn set_driver_online(
        &self,
        driver_id: DriverId,
        online: bool,
    ) -> Result<DriverAccount, DispatchError>;

    /// Sets the administrative status. Any status other than
    /// [`DriverStatus::Active`] also forces the driver offline.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DriverNotFound`] for an unknown driver, or
    /// [`DispatchError::UpstreamUnavailable`].
    async fn set_driver_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
    ) -> Result<DriverAccount, DispatchError>;

    /// Registers the driver's push-notification token.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DriverNotFound`] for an unknown driver, or
    /// [`DispatchError::UpstreamUnavailable`].
    async fn set_driver_push_endpoint(
        &self,
        driver_id: DriverId,
        token: &str,
    ) -> Result<(), DispatchError>;

    /// Returns the rider's push-notification token, if registered.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] on store failure.
    async fn rider_push_endpoint(&self, rider_id: RiderId) -> Result<Option<String>, DispatchError>;

    /// Returns the configured tariff for a vehicle class, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] on store failure.
    async fn vehicle_tariff(&self, vehicle_class: VehicleClass)
    -> Result<Option<Tariff>, DispatchError>;

    /// Persists a new ride in status [`RideStatus::Requested`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] on store failure.
    async fn create_ride(&self, new_ride: NewRide) -> Result<Ride, DispatchError>;

    /// Loads one ride.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] on store failure.
    async fn ride(&self, ride_id: RideId) -> Result<Option<Ride>, DispatchError>;

    /// Atomically moves a ride from `from` to `to` on behalf of `driver_id`.
    ///
    /// Leaving [`RideStatus::Requested`] requires the ride to be unassigned
    /// and assigns it to `driver_id`; every other transition requires the
    /// ride to be assigned to `driver_id` already. When two callers race,
    /// exactly one observes [`TransitionOutcome::Applied`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RideNotFound`] if the ride does not exist, or
    /// [`DispatchError::UpstreamUnavailable`].
    async fn transition_ride_status(
        &self,
        ride_id: RideId,
        from: RideStatus,
        to: RideStatus,
        driver_id: DriverId,
    ) -> Result<TransitionOutcome, DispatchError>;

    /// Atomically cancels a ride owned by `rider_id` while it is still
    /// `Requested` or `Accepted`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RideNotFound`] if no such ride belongs to the
    /// rider, or [`DispatchError::UpstreamUnavailable`].
    async fn cancel_ride(
        &self,
        ride_id: RideId,
        rider_id: RiderId,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, DispatchError>;

    /// Checks the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if it is not.
    async fn ping(&self) -> Result<(), DispatchError>;

    /// Short backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}
