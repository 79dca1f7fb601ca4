//! Dispatch fan-out: offering a new ride to nearby eligible drivers.
//!
//! Two halves:
//!
//! - [`Fanout::dispatch`] runs in the background on the process that created
//!   the ride. It filters the nearby candidates through the system of record,
//!   sends push notifications, and publishes a [`RideRequestEvent`].
//! - [`run_dispatch_relay`] runs on every process. It receives published
//!   requests and emits `newRide` into the `driver:<id>` rooms hosted here.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use crate::broker::RideRequestBroker;
use crate::domain::{
    DriverId, EventBus, NearbyDriver, Ride, RideRequestEvent, RideStatus, Room, ServerEvent,
};
use crate::error::DispatchError;
use crate::index::DriverIndex;
use crate::persistence::RideStore;
use crate::push::{PushNotification, PushNotifier};

/// Delay before re-subscribing after the broker stream ends.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Background dispatcher for newly created rides.
#[derive(Debug, Clone)]
pub struct Fanout {
    store: Arc<dyn RideStore>,
    broker: Arc<dyn RideRequestBroker>,
    notifier: Arc<dyn PushNotifier>,
}

impl Fanout {
    /// Creates a new `Fanout`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RideStore>,
        broker: Arc<dyn RideRequestBroker>,
        notifier: Arc<dyn PushNotifier>,
    ) -> Self {
        Self {
            store,
            broker,
            notifier,
        }
    }

    /// Offers `ride` to the eligible subset of `nearby`.
    ///
    /// Never fails: every error is logged with the ride id and the fan-out
    /// stops at that point. Returns the drivers the request was published
    /// for.
    pub async fn dispatch(&self, ride: &Ride, nearby: &[NearbyDriver]) -> Vec<DriverId> {
        let candidates: Vec<DriverId> = nearby.iter().map(|d| d.driver_id).collect();
        if candidates.is_empty() {
            tracing::info!(error = %DispatchError::NoEligibleDrivers(ride.id), "nobody nearby");
            return Vec::new();
        }

        let eligible = match self
            .store
            .eligible_drivers(&candidates, ride.vehicle_class)
            .await
        {
            Ok(eligible) => eligible,
            Err(e) => {
                tracing::error!(ride_id = %ride.id, error = %e, "eligibility lookup failed");
                return Vec::new();
            }
        };
        if eligible.is_empty() {
            tracing::info!(
                error = %DispatchError::NoEligibleDrivers(ride.id),
                nearby = candidates.len(),
                "no nearby driver passed the eligibility filter"
            );
            return Vec::new();
        }

        // The ride may have been cancelled while the lookup ran.
        match self.store.ride(ride.id).await {
            Ok(Some(current)) if current.status == RideStatus::Requested => {}
            Ok(_) => {
                tracing::info!(ride_id = %ride.id, "ride no longer requested, skipping dispatch");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(ride_id = %ride.id, error = %e, "could not re-check ride status");
            }
        }

        let tokens: Vec<String> = eligible
            .iter()
            .map(|d| d.notification_token.clone())
            .collect();
        if let Err(e) = self.notifier.notify(&tokens, &ride_request_push(ride)).await {
            tracing::warn!(ride_id = %ride.id, error = %e, "ride request push failed");
        }

        let driver_ids: Vec<DriverId> = eligible.iter().map(|d| d.driver_id).collect();
        let event = RideRequestEvent {
            ride_id: ride.id,
            rider_id: ride.rider_id,
            pickup: ride.origin,
            pickup_name: ride.origin_name.clone(),
            destination: ride.destination_name.clone(),
            fare: ride.fare,
            distance: ride.distance_m,
            duration: ride.duration_s,
            vehicle_class: ride.vehicle_class,
            candidates: driver_ids.clone(),
        };
        if let Err(e) = self.broker.publish(&event).await {
            tracing::error!(ride_id = %ride.id, error = %e, "ride request publish failed");
        }

        tracing::info!(
            ride_id = %ride.id,
            nearby = candidates.len(),
            eligible = driver_ids.len(),
            "ride dispatched"
        );
        driver_ids
    }
}

fn ride_request_push(ride: &Ride) -> PushNotification {
    PushNotification::new(
        "New Ride Request",
        format!(
            "Pickup: {} to {} ({:.0})",
            ride.origin_name, ride.destination_name, ride.fare
        ),
    )
    .with_data("type", "ride_request")
    .with_data("rideId", ride.id)
    .with_data("pickupLat", format!("{:.6}", ride.origin.latitude))
    .with_data("pickupLng", format!("{:.6}", ride.origin.longitude))
    .with_data("originName", &ride.origin_name)
    .with_data("destinationName", &ride.destination_name)
    .with_data("fare", format!("{:.2}", ride.fare))
    .with_data("vehicleType", ride.vehicle_class)
}

/// Delivers one received ride request to the local driver rooms.
///
/// Only drivers in the event's candidate set are offered the ride; an
/// empty set reaches nobody. The nearby lookup is re-run here so a driver
/// that drifted out of range since publication is skipped. Returns how many
/// rooms were reached.
pub async fn relay_ride_request(
    index: &dyn DriverIndex,
    event_bus: &EventBus,
    radius_km: f64,
    event: RideRequestEvent,
) -> usize {
    if event.candidates.is_empty() {
        tracing::warn!(ride_id = %event.ride_id, "ride request without candidates, not relayed");
        return 0;
    }
    let nearby = match index.query_nearby(event.pickup, radius_km).await {
        Ok(nearby) => nearby,
        Err(e) => {
            tracing::error!(ride_id = %event.ride_id, error = %e, "relay nearby lookup failed");
            return 0;
        }
    };

    let ride_id = event.ride_id;
    let offer = event.offer();
    let mut delivered = 0;
    for driver in nearby {
        if !event.candidates.contains(&driver.driver_id) {
            continue;
        }
        if event_bus.emit(Room::Driver(driver.driver_id), ServerEvent::NewRide(offer.clone())) {
            delivered += 1;
        }
    }
    tracing::debug!(%ride_id, delivered, "ride request relayed to local drivers");
    delivered
}

/// Subscribes to the broker and relays every ride request until the task
/// is aborted. A dropped subscription is re-established after a short delay.
pub async fn run_dispatch_relay(
    broker: Arc<dyn RideRequestBroker>,
    index: Arc<dyn DriverIndex>,
    event_bus: EventBus,
    radius_km: f64,
) {
    loop {
        match broker.subscribe().await {
            Ok(mut requests) => {
                tracing::info!("dispatch relay subscribed");
                while let Some(event) = requests.next().await {
                    relay_ride_request(index.as_ref(), &event_bus, radius_km, event).await;
                }
                tracing::warn!("dispatch relay subscription ended");
            }
            Err(e) => {
                tracing::error!(error = %e, "dispatch relay could not subscribe");
            }
        }
        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        Coordinate, DriverAccount, DriverPosition, DriverStatus, NewRide, RiderId, RouteToken,
        VehicleClass,
    };
    use crate::index::InMemoryDriverIndex;
    use crate::persistence::InMemoryRideStore;
    use crate::push::DisabledNotifier;

    fn point(lat: f64, lng: f64) -> Coordinate {
        let Ok(c) = Coordinate::new(lat, lng) else {
            panic!("valid coordinate");
        };
        c
    }

    async fn driver(store: &InMemoryRideStore, token: Option<&str>) -> DriverId {
        let id = DriverId::new();
        store
            .upsert_driver(DriverAccount {
                id,
                name: "Arun".to_string(),
                vehicle_class: VehicleClass::Car,
                status: DriverStatus::Active,
                is_online: true,
                notification_token: token.map(str::to_string),
            })
            .await;
        id
    }

    fn new_ride() -> NewRide {
        NewRide {
            rider_id: RiderId::new(),
            route_token: RouteToken::generate(),
            fare: 120.0,
            distance_m: 3_000,
            duration_s: 600,
            vehicle_class: VehicleClass::Car,
            origin: point(12.93, 77.61),
            destination: point(12.95, 77.62),
            origin_name: "A".to_string(),
            destination_name: "B".to_string(),
            polyline: String::new(),
        }
    }

    fn nearby(id: DriverId) -> NearbyDriver {
        NearbyDriver {
            driver_id: id,
            coordinate: point(12.93, 77.61),
            distance_km: 0.1,
            session_id: None,
        }
    }

    #[tokio::test]
    async fn dispatch_publishes_only_eligible_drivers() {
        let store = Arc::new(InMemoryRideStore::new());
        let broker = Arc::new(crate::broker::LocalBroker::new(8));
        let Ok(mut requests) = broker.subscribe().await else {
            panic!("subscribe failed");
        };
        let good = driver(&store, Some("tok")).await;
        let tokenless = driver(&store, None).await;
        let Ok(ride) = store.create_ride(new_ride()).await else {
            panic!("create failed");
        };

        let fanout = Fanout::new(store, broker, Arc::new(DisabledNotifier));
        let published = fanout
            .dispatch(&ride, &[nearby(good), nearby(tokenless)])
            .await;
        assert_eq!(published, vec![good]);

        let Some(event) = requests.next().await else {
            panic!("expected published request");
        };
        assert_eq!(event.ride_id, ride.id);
        assert_eq!(event.candidates, vec![good]);
    }

    #[tokio::test]
    async fn dispatch_skips_cancelled_ride() {
        let store = Arc::new(InMemoryRideStore::new());
        let good = driver(&store, Some("tok")).await;
        let Ok(ride) = store.create_ride(new_ride()).await else {
            panic!("create failed");
        };
        tokio_test::assert_ok!(store.cancel_ride(ride.id, ride.rider_id, None).await);

        let fanout = Fanout::new(
            store,
            Arc::new(crate::broker::LocalBroker::new(8)),
            Arc::new(DisabledNotifier),
        );
        assert!(fanout.dispatch(&ride, &[nearby(good)]).await.is_empty());
    }

    #[tokio::test]
    async fn relay_emits_only_to_candidates_in_range_with_local_sessions() {
        let index = InMemoryDriverIndex::new(Duration::from_secs(3600));
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let (candidate, outsider, far) = (DriverId::new(), DriverId::new(), DriverId::new());
        for (id, lat) in [(candidate, 12.931), (outsider, 12.932), (far, 13.5)] {
            tokio_test::assert_ok!(
                index
                    .update_position(DriverPosition::new(id, point(lat, 77.61), None))
                    .await
            );
            bus.join(Room::Driver(id));
        }

        let event = RideRequestEvent {
            ride_id: crate::domain::RideId::new(),
            rider_id: RiderId::new(),
            pickup: point(12.93, 77.61),
            pickup_name: "A".to_string(),
            destination: "B".to_string(),
            fare: 100.0,
            distance: 1_000,
            duration: 300,
            vehicle_class: VehicleClass::Car,
            candidates: vec![candidate, far],
        };
        assert_eq!(relay_ride_request(&index, &bus, 5.0, event).await, 1);

        let Ok(received) = rx.recv().await else {
            panic!("expected newRide");
        };
        assert_eq!(received.room, Room::Driver(candidate));
        assert_eq!(received.event.event_name(), "newRide");
    }

    #[tokio::test]
    async fn relay_with_empty_candidate_set_reaches_nobody() {
        let index = InMemoryDriverIndex::new(Duration::from_secs(3600));
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let nearby_driver = DriverId::new();
        tokio_test::assert_ok!(
            index
                .update_position(DriverPosition::new(nearby_driver, point(12.931, 77.61), None))
                .await
        );
        bus.join(Room::Driver(nearby_driver));

        let event = RideRequestEvent {
            ride_id: crate::domain::RideId::new(),
            rider_id: RiderId::new(),
            pickup: point(12.93, 77.61),
            pickup_name: "A".to_string(),
            destination: "B".to_string(),
            fare: 100.0,
            distance: 1_000,
            duration: 300,
            vehicle_class: VehicleClass::Car,
            candidates: Vec::new(),
        };
        assert_eq!(relay_ride_request(&index, &bus, 5.0, event).await, 0);
        assert!(rx.try_recv().is_err());
    }
}
