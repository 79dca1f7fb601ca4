//! Ride lifecycle: estimate, create, status transitions and cancellation.
//!
//! Every mutation follows the same pattern: validate, write the system of
//! record, answer the caller, then notify the other party in the
//! background through [`BackgroundTasks`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::{BackgroundTasks, Fanout};
use crate::domain::{
    Coordinate, DriverId, DriverPosition, EventBus, NewRide, Ride, RideId, RideStatus,
    RideStatusEvent, RiderId, Room, RouteQuote, RouteToken, ServerEvent, TransitionOutcome,
    VehicleClass,
};
use crate::error::DispatchError;
use crate::index::DriverIndex;
use crate::persistence::RideStore;
use crate::push::{PushNotification, PushNotifier};
use crate::route_cache::RouteCache;
use crate::routing::RoutePlanner;

/// Tunables of the ride flow.
#[derive(Debug, Clone)]
pub struct RideSettings {
    /// Radius of the dispatch nearby query.
    pub dispatch_radius_km: f64,
    /// Platform fee added to every fare, in percent.
    pub platform_fee_pct: f64,
    /// Whether a route token can create at most one ride.
    pub single_use_tokens: bool,
    /// Lifetime of a quote, reported to clients.
    pub quote_ttl: Duration,
}

impl Default for RideSettings {
    fn default() -> Self {
        Self {
            dispatch_radius_km: 5.0,
            platform_fee_pct: 15.0,
            single_use_tokens: false,
            quote_ttl: Duration::from_secs(15 * 60),
        }
    }
}

/// Input of [`RideService::estimate`].
#[derive(Debug, Clone)]
pub struct EstimateRequest {
    /// Pickup point.
    pub origin: Coordinate,
    /// Drop-off point.
    pub destination: Coordinate,
    /// Pickup display name.
    pub origin_name: String,
    /// Drop-off display name.
    pub destination_name: String,
    /// Vehicle class to price for.
    pub vehicle_class: VehicleClass,
}

/// A stored quote and the token that redeems it.
#[derive(Debug, Clone)]
pub struct RouteEstimate {
    /// Token to pass to ride creation.
    pub token: RouteToken,
    /// The priced quote.
    pub quote: RouteQuote,
    /// Seconds until the token expires.
    pub expires_in_secs: u64,
}

/// Result of ride creation.
#[derive(Debug, Clone)]
pub struct CreatedRide {
    /// The persisted ride.
    pub ride: Ride,
    /// Drivers found within the dispatch radius, before eligibility.
    pub nearby_driver_count: usize,
}

/// The collaborators [`RideService`] is built from.
#[derive(Debug, Clone)]
pub struct RideDeps {
    /// System of record.
    pub store: Arc<dyn RideStore>,
    /// Driver positions.
    pub index: Arc<dyn DriverIndex>,
    /// Quote storage.
    pub route_cache: Arc<dyn RouteCache>,
    /// Route planning collaborator.
    pub planner: Arc<dyn RoutePlanner>,
    /// Push delivery.
    pub notifier: Arc<dyn PushNotifier>,
    /// Background dispatcher.
    pub fanout: Fanout,
    /// Realtime rooms.
    pub event_bus: EventBus,
    /// Tracked background work.
    pub tasks: BackgroundTasks,
}

/// Orchestrates the ride flow across the store, index, cache and fan-out.
#[derive(Debug, Clone)]
pub struct RideService {
    deps: RideDeps,
    settings: RideSettings,
}

impl RideService {
    /// Creates a new `RideService`.
    #[must_use]
    pub fn new(deps: RideDeps, settings: RideSettings) -> Self {
        Self { deps, settings }
    }

    /// Returns the configured settings.
    #[must_use]
    pub fn settings(&self) -> &RideSettings {
        &self.settings
    }

    /// Plans and prices a trip and caches the quote under a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RouteUnavailable`] from the planner or
    /// [`DispatchError::UpstreamUnavailable`] from the cache.
    pub async fn estimate(&self, request: EstimateRequest) -> Result<RouteEstimate, DispatchError> {
        let route = self
            .deps
            .planner
            .plan_route(request.origin, request.destination, request.vehicle_class)
            .await?;

        let tariff = match self.deps.store.vehicle_tariff(request.vehicle_class).await {
            Ok(Some(tariff)) => tariff,
            Ok(None) => request.vehicle_class.default_tariff(),
            Err(e) => {
                tracing::warn!(error = %e, "tariff lookup failed, using default tariff");
                request.vehicle_class.default_tariff()
            }
        };
        let fare = tariff.fare(
            route.distance_m,
            route.duration_s,
            self.settings.platform_fee_pct,
        );

        let quote = RouteQuote {
            polyline: route.polyline,
            distance_m: route.distance_m,
            duration_s: route.duration_s,
            fare,
            vehicle_class: request.vehicle_class,
            origin: request.origin,
            destination: request.destination,
            origin_name: request.origin_name,
            destination_name: request.destination_name,
            external_route_ref: route.external_ref,
            quoted_at: Utc::now(),
        };
        let token = self.deps.route_cache.store(&quote).await?;
        tracing::debug!(vehicle_class = %quote.vehicle_class, fare, "route quoted");

        Ok(RouteEstimate {
            token,
            quote,
            expires_in_secs: self.settings.quote_ttl.as_secs(),
        })
    }

    /// Creates a ride from a cached quote and starts dispatch.
    ///
    /// Responds as soon as the ride is persisted; eligibility filtering,
    /// push and publication run in the background. A failed nearby lookup
    /// is logged and reported as zero nearby drivers.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RouteExpiredOrUnknown`] for an unknown or
    /// expired token, [`DispatchError::InvalidRequest`] if `vehicle_class`
    /// differs from the quoted one, or a store/cache error.
    pub async fn create_ride(
        &self,
        token: RouteToken,
        rider_id: RiderId,
        vehicle_class: Option<VehicleClass>,
    ) -> Result<CreatedRide, DispatchError> {
        if let Some(requested) = vehicle_class {
            let quote = self.deps.route_cache.fetch(token).await?;
            if quote.vehicle_class != requested {
                return Err(DispatchError::InvalidRequest(format!(
                    "route was quoted for {}, not {requested}",
                    quote.vehicle_class
                )));
            }
        }
        let quote = if self.settings.single_use_tokens {
            self.deps.route_cache.take(token).await?
        } else {
            self.deps.route_cache.fetch(token).await?
        };

        let ride = self
            .deps
            .store
            .create_ride(NewRide {
                rider_id,
                route_token: token,
                fare: quote.fare,
                distance_m: quote.distance_m,
                duration_s: quote.duration_s,
                vehicle_class: quote.vehicle_class,
                origin: quote.origin,
                destination: quote.destination,
                origin_name: quote.origin_name,
                destination_name: quote.destination_name,
                polyline: quote.polyline,
            })
            .await?;

        let nearby = match self
            .deps
            .index
            .query_nearby(ride.origin, self.settings.dispatch_radius_km)
            .await
        {
            Ok(nearby) => nearby,
            Err(e) => {
                tracing::error!(ride_id = %ride.id, error = %e, "nearby lookup failed on ride creation");
                Vec::new()
            }
        };
        let nearby_driver_count = nearby.len();
        tracing::info!(ride_id = %ride.id, %rider_id, nearby = nearby_driver_count, "ride created");

        let fanout = self.deps.fanout.clone();
        let dispatched = ride.clone();
        self.deps.tasks.spawn(async move {
            fanout.dispatch(&dispatched, &nearby).await;
        });

        Ok(CreatedRide {
            ride,
            nearby_driver_count,
        })
    }

    /// Loads a ride.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RideNotFound`] or a store error.
    pub async fn ride(&self, ride_id: RideId) -> Result<Ride, DispatchError> {
        self.deps
            .store
            .ride(ride_id)
            .await?
            .ok_or(DispatchError::RideNotFound(ride_id))
    }

    /// Live position of the driver assigned to a rider's ride.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RideNotFound`] if the ride does not belong
    /// to the rider or has no driver yet, [`DispatchError::DriverNotFound`]
    /// if the driver has no live position, or an upstream error.
    pub async fn assigned_driver_position(
        &self,
        ride_id: RideId,
        rider_id: RiderId,
    ) -> Result<DriverPosition, DispatchError> {
        let ride = self.ride(ride_id).await?;
        let driver_id = ride
            .driver_id
            .filter(|_| ride.rider_id == rider_id)
            .ok_or(DispatchError::RideNotFound(ride_id))?;
        self.deps
            .index
            .position(driver_id)
            .await?
            .ok_or(DispatchError::DriverNotFound(driver_id))
    }

    /// Applies a driver-initiated status change.
    ///
    /// Accepting is a compare-and-swap from `Requested`: of several drivers
    /// accepting the same ride, exactly one succeeds and the others get
    /// [`DispatchError::RideAlreadyClaimed`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DriverNotFound`],
    /// [`DispatchError::DriverNotApproved`] for an offline or non-active
    /// driver, [`DispatchError::RideAlreadyClaimed`],
    /// [`DispatchError::InvalidTransition`], [`DispatchError::RideNotFound`],
    /// or a store error.
    pub async fn update_status(
        &self,
        driver_id: DriverId,
        ride_id: RideId,
        to: RideStatus,
    ) -> Result<Ride, DispatchError> {
        let account = self
            .deps
            .store
            .driver_account(driver_id)
            .await?
            .ok_or(DispatchError::DriverNotFound(driver_id))?;
        if !account.can_take_rides() {
            let reason = if account.is_online {
                account.status.denial_reason()
            } else {
                "driver is offline"
            };
            return Err(DispatchError::DriverNotApproved {
                driver_id,
                reason: reason.to_string(),
            });
        }

        let from = to.driver_predecessor().ok_or_else(|| {
            DispatchError::InvalidRequest(format!("drivers cannot move a ride to {to}"))
        })?;

        let outcome = self
            .deps
            .store
            .transition_ride_status(ride_id, from, to, driver_id)
            .await?;
        let ride = match outcome {
            TransitionOutcome::Applied(ride) => ride,
            TransitionOutcome::Conflict if to == RideStatus::Accepted => {
                tracing::info!(%ride_id, %driver_id, "accept lost the race");
                return Err(DispatchError::RideAlreadyClaimed(ride_id));
            }
            TransitionOutcome::Conflict => {
                return Err(DispatchError::InvalidTransition {
                    ride_id,
                    expected: from,
                    to,
                });
            }
        };

        tracing::info!(%ride_id, %driver_id, status = %to, "ride status updated");
        self.notify_rider(&ride, &account.name);
        Ok(ride)
    }

    /// Cancels a ride on behalf of its rider while it is `Requested` or
    /// `Accepted`. An assigned driver is notified.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RideNotFound`] if the ride does not belong
    /// to the rider, [`DispatchError::InvalidTransition`] if it already
    /// started or ended, or a store error.
    pub async fn cancel(
        &self,
        ride_id: RideId,
        rider_id: RiderId,
        reason: Option<&str>,
    ) -> Result<Ride, DispatchError> {
        let ride = match self.deps.store.cancel_ride(ride_id, rider_id, reason).await? {
            TransitionOutcome::Applied(ride) => ride,
            TransitionOutcome::Conflict => {
                return Err(DispatchError::InvalidTransition {
                    ride_id,
                    expected: RideStatus::Requested,
                    to: RideStatus::Cancelled,
                });
            }
        };

        tracing::info!(%ride_id, %rider_id, "ride cancelled by rider");
        self.notify_driver_of_cancellation(&ride);
        Ok(ride)
    }

    fn notify_rider(&self, ride: &Ride, driver_name: &str) {
        let event = status_event(ride);
        self.deps.event_bus.emit(Room::Rider(ride.rider_id), event);

        let store = Arc::clone(&self.deps.store);
        let notifier = Arc::clone(&self.deps.notifier);
        let push = rider_status_push(ride, driver_name);
        let (ride_id, rider_id) = (ride.id, ride.rider_id);
        self.deps.tasks.spawn(async move {
            let token = match store.rider_push_endpoint(rider_id).await {
                Ok(Some(token)) => token,
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(%ride_id, error = %e, "rider push endpoint lookup failed");
                    return;
                }
            };
            if let Err(e) = notifier.notify(&[token], &push).await {
                tracing::warn!(%ride_id, error = %e, "ride status push failed");
            }
        });
    }

    fn notify_driver_of_cancellation(&self, ride: &Ride) {
        let Some(driver_id) = ride.driver_id else {
            return;
        };
        self.deps
            .event_bus
            .emit(Room::Driver(driver_id), status_event(ride));

        let store = Arc::clone(&self.deps.store);
        let notifier = Arc::clone(&self.deps.notifier);
        let ride_id = ride.id;
        self.deps.tasks.spawn(async move {
            let token = match store.driver_account(driver_id).await {
                Ok(Some(account)) => account.notification_token.filter(|t| !t.is_empty()),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(%ride_id, error = %e, "driver push endpoint lookup failed");
                    None
                }
            };
            let Some(token) = token else {
                return;
            };
            let push = PushNotification::new(
                "Ride Cancelled",
                "The rider has cancelled the ride request.",
            )
            .with_data("type", "ride_cancelled")
            .with_data("rideId", ride_id);
            if let Err(e) = notifier.notify(&[token], &push).await {
                tracing::warn!(%ride_id, error = %e, "cancellation push failed");
            }
        });
    }
}

fn status_event(ride: &Ride) -> ServerEvent {
    ServerEvent::RideStatus(RideStatusEvent {
        ride_id: ride.id,
        status: ride.status,
        driver_id: ride.driver_id,
        timestamp: ride.updated_at,
    })
}

fn rider_status_push(ride: &Ride, driver_name: &str) -> PushNotification {
    let (title, body) = match ride.status {
        RideStatus::Accepted => (
            "Ride Accepted",
            format!("{driver_name} has accepted your request and is on the way."),
        ),
        RideStatus::InProgress => (
            "Ride Started",
            "You are on your way to the destination.".to_string(),
        ),
        RideStatus::Completed => (
            "Ride Completed",
            format!(
                "You have reached your destination. Total fare: {:.2}",
                ride.fare
            ),
        ),
        RideStatus::Cancelled => ("Ride Cancelled", "The driver has cancelled the ride.".to_string()),
        RideStatus::Requested => ("Ride Update", "Your ride status has changed.".to_string()),
    };
    let push = PushNotification::new(title, body)
        .with_data("type", "ride_status")
        .with_data("rideId", ride.id)
        .with_data("status", ride.status)
        .with_data("driverName", driver_name);
    match ride.driver_id {
        Some(driver_id) => push.with_data("driverId", driver_id),
        None => push,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::broker::LocalBroker;
    use crate::domain::{DriverAccount, DriverStatus};
    use crate::index::InMemoryDriverIndex;
    use crate::persistence::InMemoryRideStore;
    use crate::route_cache::InMemoryRouteCache;
    use crate::routing::StraightLinePlanner;

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(Vec<String>, PushNotification)>>,
    }

    #[async_trait]
    impl PushNotifier for RecordingNotifier {
        async fn notify(
            &self,
            tokens: &[String],
            notification: &PushNotification,
        ) -> Result<(), DispatchError> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((tokens.to_vec(), notification.clone()));
            }
            Ok(())
        }
    }

    struct Harness {
        service: RideService,
        store: Arc<InMemoryRideStore>,
        index: Arc<InMemoryDriverIndex>,
        notifier: Arc<RecordingNotifier>,
        tasks: BackgroundTasks,
    }

    fn harness(settings: RideSettings) -> Harness {
        let store = Arc::new(InMemoryRideStore::new());
        let index = Arc::new(InMemoryDriverIndex::new(Duration::from_secs(3600)));
        let notifier = Arc::new(RecordingNotifier::default());
        let broker = Arc::new(LocalBroker::new(16));
        let tasks = BackgroundTasks::new();
        let deps = RideDeps {
            store: Arc::clone(&store) as Arc<dyn RideStore>,
            index: Arc::clone(&index) as Arc<dyn DriverIndex>,
            route_cache: Arc::new(InMemoryRouteCache::new(settings.quote_ttl)),
            planner: Arc::new(StraightLinePlanner::default()),
            notifier: Arc::clone(&notifier) as Arc<dyn PushNotifier>,
            fanout: Fanout::new(
                Arc::clone(&store) as Arc<dyn RideStore>,
                broker,
                Arc::clone(&notifier) as Arc<dyn PushNotifier>,
            ),
            event_bus: EventBus::new(64),
            tasks: tasks.clone(),
        };
        Harness {
            service: RideService::new(deps, settings),
            store,
            index,
            notifier,
            tasks,
        }
    }

    fn point(lat: f64, lng: f64) -> Coordinate {
        let Ok(c) = Coordinate::new(lat, lng) else {
            panic!("valid coordinate");
        };
        c
    }

    fn estimate_request() -> EstimateRequest {
        EstimateRequest {
            origin: point(12.93, 77.61),
            destination: point(12.97, 77.59),
            origin_name: "Koramangala".to_string(),
            destination_name: "MG Road".to_string(),
            vehicle_class: VehicleClass::Car,
        }
    }

    async fn online_driver(h: &Harness, token: &str) -> DriverId {
        let id = DriverId::new();
        h.store
            .upsert_driver(DriverAccount {
                id,
                name: "Lakshmi".to_string(),
                vehicle_class: VehicleClass::Car,
                status: DriverStatus::Active,
                is_online: true,
                notification_token: Some(token.to_string()),
            })
            .await;
        tokio_test::assert_ok!(
            h.index
                .update_position(DriverPosition::new(id, point(12.931, 77.611), None))
                .await
        );
        id
    }

    async fn requested_ride(h: &Harness) -> CreatedRide {
        let Ok(estimate) = h.service.estimate(estimate_request()).await else {
            panic!("estimate failed");
        };
        let Ok(created) = h
            .service
            .create_ride(estimate.token, RiderId::new(), None)
            .await
        else {
            panic!("create failed");
        };
        created
    }

    #[tokio::test]
    async fn estimate_prices_with_default_tariff_and_fee() {
        let h = harness(RideSettings::default());
        let Ok(estimate) = h.service.estimate(estimate_request()).await else {
            panic!("estimate failed");
        };
        let q = &estimate.quote;
        let expected = VehicleClass::Car
            .default_tariff()
            .fare(q.distance_m, q.duration_s, 15.0);
        assert!((q.fare - expected).abs() < f64::EPSILON);
        assert_eq!(q.fare, q.fare.ceil());
        assert_eq!(estimate.expires_in_secs, 900);
    }

    #[tokio::test]
    async fn unknown_token_cannot_create_ride() {
        let h = harness(RideSettings::default());
        let result = h
            .service
            .create_ride(RouteToken::generate(), RiderId::new(), None)
            .await;
        assert!(matches!(result, Err(DispatchError::RouteExpiredOrUnknown)));
    }

    #[tokio::test]
    async fn create_reports_nearby_and_pushes_to_eligible_drivers() {
        let h = harness(RideSettings::default());
        online_driver(&h, "driver-token").await;

        let created = requested_ride(&h).await;
        assert_eq!(created.nearby_driver_count, 1);
        assert_eq!(created.ride.status, RideStatus::Requested);

        assert!(h.tasks.drain(Duration::from_secs(1)).await);
        let Ok(sent) = h.notifier.sent.lock() else {
            panic!("lock poisoned");
        };
        assert!(sent.iter().any(|(tokens, n)| {
            tokens == &vec!["driver-token".to_string()]
                && n.data.get("type").map(String::as_str) == Some("ride_request")
        }));
    }

    #[tokio::test]
    async fn vehicle_class_must_match_quote() {
        let h = harness(RideSettings::default());
        let Ok(estimate) = h.service.estimate(estimate_request()).await else {
            panic!("estimate failed");
        };
        let result = h
            .service
            .create_ride(estimate.token, RiderId::new(), Some(VehicleClass::Bike))
            .await;
        assert!(matches!(result, Err(DispatchError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn reusable_tokens_by_default_single_use_when_configured() {
        let h = harness(RideSettings::default());
        let Ok(estimate) = h.service.estimate(estimate_request()).await else {
            panic!("estimate failed");
        };
        for _ in 0..2 {
            tokio_test::assert_ok!(
                h.service
                    .create_ride(estimate.token, RiderId::new(), None)
                    .await
            );
        }

        let h = harness(RideSettings {
            single_use_tokens: true,
            ..RideSettings::default()
        });
        let Ok(estimate) = h.service.estimate(estimate_request()).await else {
            panic!("estimate failed");
        };
        tokio_test::assert_ok!(
            h.service
                .create_ride(estimate.token, RiderId::new(), None)
                .await
        );
        let second = h
            .service
            .create_ride(estimate.token, RiderId::new(), None)
            .await;
        assert!(matches!(second, Err(DispatchError::RouteExpiredOrUnknown)));
    }

    #[tokio::test]
    async fn second_accept_is_already_claimed() {
        let h = harness(RideSettings::default());
        let a = online_driver(&h, "a").await;
        let b = online_driver(&h, "b").await;
        let created = requested_ride(&h).await;

        let Ok(ride) = h
            .service
            .update_status(a, created.ride.id, RideStatus::Accepted)
            .await
        else {
            panic!("first accept must win");
        };
        assert_eq!(ride.driver_id, Some(a));

        let second = h
            .service
            .update_status(b, created.ride.id, RideStatus::Accepted)
            .await;
        let Err(err) = second else {
            panic!("second accept must fail");
        };
        assert!(matches!(err, DispatchError::RideAlreadyClaimed(_)));
        assert!(err.to_string().contains("already taken"));
    }

    #[tokio::test]
    async fn lifecycle_runs_to_completion_in_order() {
        let h = harness(RideSettings::default());
        let d = online_driver(&h, "d").await;
        let id = requested_ride(&h).await.ride.id;

        let skipped = h.service.update_status(d, id, RideStatus::InProgress).await;
        assert!(matches!(skipped, Err(DispatchError::InvalidTransition { .. })));

        for status in [RideStatus::Accepted, RideStatus::InProgress, RideStatus::Completed] {
            let Ok(ride) = h.service.update_status(d, id, status).await else {
                panic!("transition to {status} failed");
            };
            assert_eq!(ride.status, status);
        }

        let back = h.service.update_status(d, id, RideStatus::Requested).await;
        assert!(matches!(back, Err(DispatchError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn offline_driver_cannot_accept() {
        let h = harness(RideSettings::default());
        let d = online_driver(&h, "d").await;
        tokio_test::assert_ok!(h.store.set_driver_online(d, false).await);
        let id = requested_ride(&h).await.ride.id;

        let result = h.service.update_status(d, id, RideStatus::Accepted).await;
        assert!(matches!(result, Err(DispatchError::DriverNotApproved { .. })));
    }

    #[tokio::test]
    async fn rider_cancel_after_accept_notifies_driver() {
        let h = harness(RideSettings::default());
        let d = online_driver(&h, "driver-token").await;
        let created = requested_ride(&h).await;
        let (id, rider) = (created.ride.id, created.ride.rider_id);
        tokio_test::assert_ok!(h.service.update_status(d, id, RideStatus::Accepted).await);

        let Ok(ride) = h.service.cancel(id, rider, Some("plans changed")).await else {
            panic!("cancel failed");
        };
        assert_eq!(ride.status, RideStatus::Cancelled);

        assert!(h.tasks.drain(Duration::from_secs(1)).await);
        let Ok(sent) = h.notifier.sent.lock() else {
            panic!("lock poisoned");
        };
        assert!(
            sent.iter()
                .any(|(_, n)| n.data.get("type").map(String::as_str) == Some("ride_cancelled"))
        );
    }

    #[tokio::test]
    async fn cancel_in_progress_ride_is_rejected() {
        let h = harness(RideSettings::default());
        let d = online_driver(&h, "d").await;
        let created = requested_ride(&h).await;
        let (id, rider) = (created.ride.id, created.ride.rider_id);
        tokio_test::assert_ok!(h.service.update_status(d, id, RideStatus::Accepted).await);
        tokio_test::assert_ok!(h.service.update_status(d, id, RideStatus::InProgress).await);

        let result = h.service.cancel(id, rider, None).await;
        assert!(matches!(result, Err(DispatchError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn rider_sees_assigned_driver_position() {
        let h = harness(RideSettings::default());
        let d = online_driver(&h, "d").await;
        let created = requested_ride(&h).await;
        let (id, rider) = (created.ride.id, created.ride.rider_id);

        let before = h.service.assigned_driver_position(id, rider).await;
        assert!(matches!(before, Err(DispatchError::RideNotFound(_))));

        tokio_test::assert_ok!(h.service.update_status(d, id, RideStatus::Accepted).await);
        let Ok(position) = h.service.assigned_driver_position(id, rider).await else {
            panic!("driver position expected");
        };
        assert_eq!(position.driver_id, d);

        let stranger = h.service.assigned_driver_position(id, RiderId::new()).await;
        assert!(matches!(stranger, Err(DispatchError::RideNotFound(_))));
    }
}
