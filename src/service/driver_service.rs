//! Driver availability and account status.

use std::sync::Arc;

use crate::domain::{DriverAccount, DriverId, DriverStatus};
use crate::error::DispatchError;
use crate::index::DriverIndex;
use crate::persistence::RideStore;

/// Keeps the system of record and the driver index consistent when a
/// driver goes offline or loses approval.
#[derive(Debug, Clone)]
pub struct DriverService {
    store: Arc<dyn RideStore>,
    index: Arc<dyn DriverIndex>,
}

impl DriverService {
    /// Creates a new `DriverService`.
    #[must_use]
    pub fn new(store: Arc<dyn RideStore>, index: Arc<dyn DriverIndex>) -> Self {
        Self { store, index }
    }

    /// Loads a driver account.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DriverNotFound`] or a store error.
    pub async fn account(&self, driver_id: DriverId) -> Result<DriverAccount, DispatchError> {
        self.store
            .driver_account(driver_id)
            .await?
            .ok_or(DispatchError::DriverNotFound(driver_id))
    }

    /// Toggles a driver online or offline.
    ///
    /// Only `active` drivers may go online. Going offline also removes the
    /// driver's position from the index.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DriverNotApproved`] when a non-active driver
    /// tries to go online, [`DispatchError::DriverNotFound`], or a store
    /// error.
    pub async fn set_availability(
        &self,
        driver_id: DriverId,
        online: bool,
    ) -> Result<DriverAccount, DispatchError> {
        let account = self.account(driver_id).await?;
        if online && account.status != DriverStatus::Active {
            return Err(DispatchError::DriverNotApproved {
                driver_id,
                reason: account.status.denial_reason().to_string(),
            });
        }

        let account = self.store.set_driver_online(driver_id, online).await?;
        if !online {
            self.drop_position(driver_id).await;
        }
        tracing::info!(%driver_id, online, "driver availability changed");
        Ok(account)
    }

    /// Administrative status change. Anything but `active` forces the driver
    /// offline and removes its position.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DriverNotFound`] or a store error.
    pub async fn set_account_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
    ) -> Result<DriverAccount, DispatchError> {
        let account = self.store.set_driver_status(driver_id, status).await?;
        if status != DriverStatus::Active {
            self.drop_position(driver_id).await;
        }
        tracing::info!(%driver_id, status = %status, "driver account status changed");
        Ok(account)
    }

    /// Registers the driver's push-notification token.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] for a blank token,
    /// [`DispatchError::DriverNotFound`], or a store error.
    pub async fn register_push_token(
        &self,
        driver_id: DriverId,
        token: &str,
    ) -> Result<(), DispatchError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "notification token must not be empty".to_string(),
            ));
        }
        self.store.set_driver_push_endpoint(driver_id, token).await
    }

    async fn drop_position(&self, driver_id: DriverId) {
        // The account flag is authoritative; a stale position expires on
        // its own and is filtered out by eligibility.
        if let Err(e) = self.index.remove_driver(driver_id).await {
            tracing::warn!(%driver_id, error = %e, "failed to remove driver position");
        }
    }
}
