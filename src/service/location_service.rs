//! Driver heartbeats, nearby lookups and live location relay.

use std::sync::Arc;

use crate::domain::{
    Coordinate, DriverId, DriverPosition, EventBus, LocationRelay, NearbyDriver, RiderId, Room,
    ServerEvent, SessionId,
};
use crate::error::DispatchError;
use crate::index::DriverIndex;

/// Front door to the [`DriverIndex`] for the REST and realtime layers.
#[derive(Debug, Clone)]
pub struct LocationService {
    index: Arc<dyn DriverIndex>,
    event_bus: EventBus,
}

impl LocationService {
    /// Creates a new `LocationService`.
    #[must_use]
    pub fn new(index: Arc<dyn DriverIndex>, event_bus: EventBus) -> Self {
        Self { index, event_bus }
    }

    /// Returns the underlying index.
    #[must_use]
    pub fn index(&self) -> &Arc<dyn DriverIndex> {
        &self.index
    }

    /// Records a driver heartbeat.
    ///
    /// # Errors
    ///
    /// Propagates [`DispatchError::UpstreamUnavailable`] from the index; the
    /// heartbeat is then not accepted.
    pub async fn heartbeat(&self, position: DriverPosition) -> Result<(), DispatchError> {
        let driver_id = position.driver_id;
        self.index.update_position(position).await.inspect_err(|e| {
            tracing::warn!(%driver_id, error = %e, "heartbeat rejected");
        })
    }

    /// Relays a driver's position to the rider's room. Fire-and-forget:
    /// returns whether anyone on this process was listening.
    pub fn relay_to_rider(
        &self,
        driver_id: DriverId,
        rider_id: RiderId,
        coordinate: Coordinate,
        heading: Option<f64>,
    ) -> bool {
        self.event_bus.emit(
            Room::Rider(rider_id),
            ServerEvent::RideUpdate(LocationRelay {
                driver_id,
                rider_id,
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
                heading,
            }),
        )
    }

    /// Drivers within `radius_km` of `center`, nearest first.
    ///
    /// # Errors
    ///
    /// See [`DriverIndex::query_nearby`].
    pub async fn nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<NearbyDriver>, DispatchError> {
        self.index.query_nearby(center, radius_km).await
    }

    /// Removes a driver from the index.
    ///
    /// # Errors
    ///
    /// See [`DriverIndex::remove_driver`].
    pub async fn remove(&self, driver_id: DriverId) -> Result<(), DispatchError> {
        self.index.remove_driver(driver_id).await
    }

    /// Removes a driver only if its current position was reported by
    /// `session_id`, so a reconnect on a newer session is left alone.
    ///
    /// Returns whether the position was removed. Another heartbeat landing
    /// between the check and the delete can still be lost; the driver's next
    /// heartbeat restores it.
    ///
    /// # Errors
    ///
    /// See [`DriverIndex::position`] and [`DriverIndex::remove_driver`].
    pub async fn remove_if_owned(
        &self,
        driver_id: DriverId,
        session_id: SessionId,
    ) -> Result<bool, DispatchError> {
        let owned = self
            .index
            .position(driver_id)
            .await?
            .is_some_and(|p| p.session_id == Some(session_id));
        if owned {
            self.index.remove_driver(driver_id).await?;
        }
        Ok(owned)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::index::InMemoryDriverIndex;

    fn service() -> LocationService {
        LocationService::new(
            Arc::new(InMemoryDriverIndex::new(Duration::from_secs(3600))),
            EventBus::new(16),
        )
    }

    fn point() -> Coordinate {
        let Ok(c) = Coordinate::new(12.93, 77.61) else {
            panic!("valid coordinate");
        };
        c
    }

    #[tokio::test]
    async fn remove_if_owned_ignores_newer_session() {
        let svc = service();
        let driver = DriverId::new();
        let (old, new) = (SessionId::new(), SessionId::new());
        tokio_test::assert_ok!(svc.heartbeat(DriverPosition::new(driver, point(), Some(new))).await);

        assert!(matches!(svc.remove_if_owned(driver, old).await, Ok(false)));
        assert!(matches!(svc.index().position(driver).await, Ok(Some(_))));

        assert!(matches!(svc.remove_if_owned(driver, new).await, Ok(true)));
        assert!(matches!(svc.index().position(driver).await, Ok(None)));
    }

    #[tokio::test]
    async fn relay_reaches_joined_rider_room() {
        let svc = service();
        let rider = RiderId::new();
        let mut rx = svc.event_bus.subscribe();

        assert!(!svc.relay_to_rider(DriverId::new(), rider, point(), None));

        svc.event_bus.join(Room::Rider(rider));
        assert!(svc.relay_to_rider(DriverId::new(), rider, point(), Some(90.0)));
        let Ok(received) = rx.recv().await else {
            panic!("expected relay");
        };
        assert_eq!(received.room, Room::Rider(rider));
        assert_eq!(received.event.event_name(), "rideUpdate");
    }
}
