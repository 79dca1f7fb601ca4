//! In-memory system of record for development and tests.
//!
//! All state sits behind one `tokio::sync::RwLock`. Compare-and-swap
//! transitions run entirely under the write lock, which gives them the same
//! first-writer-wins behaviour as the conditional `UPDATE` in PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::RideStore;
use crate::domain::{
    DriverAccount, DriverId, DriverStatus, EligibleDriver, NewRide, Ride, RideId, RideStatus,
    RiderId, Tariff, TransitionOutcome, VehicleClass,
};
use crate::error::DispatchError;

#[derive(Debug, Default)]
struct Records {
    drivers: HashMap<DriverId, DriverAccount>,
    rider_tokens: HashMap<RiderId, String>,
    tariffs: HashMap<VehicleClass, Tariff>,
    rides: HashMap<RideId, Ride>,
}

/// Single-process [`RideStore`].
#[derive(Debug, Default)]
pub struct InMemoryRideStore {
    records: RwLock<Records>,
}

impl InMemoryRideStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a driver account.
    pub async fn upsert_driver(&self, account: DriverAccount) {
        self.records.write().await.drivers.insert(account.id, account);
    }

    /// Registers a rider's push-notification token.
    pub async fn upsert_rider(&self, rider_id: RiderId, notification_token: impl Into<String>) {
        self.records
            .write()
            .await
            .rider_tokens
            .insert(rider_id, notification_token.into());
    }

    /// Configures the tariff of a vehicle class.
    pub async fn set_tariff(&self, vehicle_class: VehicleClass, tariff: Tariff) {
        self.records
            .write()
            .await
            .tariffs
            .insert(vehicle_class, tariff);
    }
}

#[async_trait]
impl RideStore for InMemoryRideStore {
    async fn eligible_drivers(
        &self,
        candidates: &[DriverId],
        vehicle_class: VehicleClass,
    ) -> Result<Vec<EligibleDriver>, DispatchError> {
        let records = self.records.read().await;
        Ok(candidates
            .iter()
            .filter_map(|id| records.drivers.get(id))
            .filter(|account| account.is_dispatchable(vehicle_class))
            .filter_map(|account| {
                account
                    .notification_token
                    .clone()
                    .map(|notification_token| EligibleDriver {
                        driver_id: account.id,
                        notification_token,
                    })
            })
            .collect())
    }

    async fn driver_account(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<DriverAccount>, DispatchError> {
        Ok(self.records.read().await.drivers.get(&driver_id).cloned())
    }

    async fn set_driver_online(
        &self,
        driver_id: DriverId,
        online: bool,
    ) -> Result<DriverAccount, DispatchError> {
        let mut records = self.records.write().await;
        let account = records
            .drivers
            .get_mut(&driver_id)
            .ok_or(DispatchError::DriverNotFound(driver_id))?;
        account.is_online = online;
        Ok(account.clone())
    }

    async fn set_driver_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
    ) -> Result<DriverAccount, DispatchError> {
        let mut records = self.records.write().await;
        let account = records
            .drivers
            .get_mut(&driver_id)
            .ok_or(DispatchError::DriverNotFound(driver_id))?;
        account.status = status;
        if status != DriverStatus::Active {
            account.is_online = false;
        }
        Ok(account.clone())
    }

    async fn set_driver_push_endpoint(
        &self,
        driver_id: DriverId,
        token: &str,
    ) -> Result<(), DispatchError> {
        let mut records = self.records.write().await;
        let account = records
            .drivers
            .get_mut(&driver_id)
            .ok_or(DispatchError::DriverNotFound(driver_id))?;
        account.notification_token = Some(token.to_string());
        Ok(())
    }

    async fn rider_push_endpoint(&self, rider_id: RiderId) -> Result<Option<String>, DispatchError> {
        Ok(self
            .records
            .read()
            .await
            .rider_tokens
            .get(&rider_id)
            .filter(|t| !t.is_empty())
            .cloned())
    }

    async fn vehicle_tariff(
        &self,
        vehicle_class: VehicleClass,
    ) -> Result<Option<Tariff>, DispatchError> {
        Ok(self
            .records
            .read()
            .await
            .tariffs
            .get(&vehicle_class)
            .copied())
    }

    async fn create_ride(&self, new_ride: NewRide) -> Result<Ride, DispatchError> {
        let ride = Ride::requested(RideId::new(), new_ride);
        self.records
            .write()
            .await
            .rides
            .insert(ride.id, ride.clone());
        Ok(ride)
    }

    async fn ride(&self, ride_id: RideId) -> Result<Option<Ride>, DispatchError> {
        Ok(self.records.read().await.rides.get(&ride_id).cloned())
    }

    async fn transition_ride_status(
        &self,
        ride_id: RideId,
        from: RideStatus,
        to: RideStatus,
        driver_id: DriverId,
    ) -> Result<TransitionOutcome, DispatchError> {
        let mut records = self.records.write().await;
        let ride = records
            .rides
            .get_mut(&ride_id)
            .ok_or(DispatchError::RideNotFound(ride_id))?;

        let owner_ok = if from == RideStatus::Requested {
            ride.driver_id.is_none()
        } else {
            ride.driver_id == Some(driver_id)
        };
        if ride.status != from || !owner_ok {
            return Ok(TransitionOutcome::Conflict);
        }

        ride.status = to;
        ride.driver_id = Some(driver_id);
        ride.updated_at = Utc::now();
        Ok(TransitionOutcome::Applied(ride.clone()))
    }

    async fn cancel_ride(
        &self,
        ride_id: RideId,
        rider_id: RiderId,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, DispatchError> {
        let mut records = self.records.write().await;
        let ride = records
            .rides
            .get_mut(&ride_id)
            .filter(|r| r.rider_id == rider_id)
            .ok_or(DispatchError::RideNotFound(ride_id))?;

        if !ride.status.is_rider_cancellable() {
            return Ok(TransitionOutcome::Conflict);
        }
        ride.status = RideStatus::Cancelled;
        ride.cancel_reason = reason.map(str::to_string);
        ride.updated_at = Utc::now();
        Ok(TransitionOutcome::Applied(ride.clone()))
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
