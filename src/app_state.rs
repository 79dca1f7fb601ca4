//! Shared application state injected into all Axum handlers.
//!
//! [`AppState::new`] is the single place where collaborators are wired
//! into services; the binary and the integration tests both go through it.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::broker::{LocalBroker, RideRequestBroker};
use crate::config::DispatchConfig;
use crate::domain::EventBus;
use crate::index::{DriverIndex, InMemoryDriverIndex};
use crate::persistence::{InMemoryRideStore, RideStore};
use crate::push::{DisabledNotifier, PushNotifier};
use crate::route_cache::{InMemoryRouteCache, RouteCache};
use crate::routing::{RoutePlanner, StraightLinePlanner};
use crate::service::{
    BackgroundTasks, DriverService, Fanout, LocationService, RideDeps, RideService, RideSettings,
    run_dispatch_relay,
};

/// External collaborators chosen at startup.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// System of record.
    pub store: Arc<dyn RideStore>,
    /// Geospatial driver index.
    pub index: Arc<dyn DriverIndex>,
    /// Route quote cache.
    pub route_cache: Arc<dyn RouteCache>,
    /// Route planning collaborator.
    pub planner: Arc<dyn RoutePlanner>,
    /// Push delivery.
    pub notifier: Arc<dyn PushNotifier>,
    /// Cross-process ride request bus.
    pub broker: Arc<dyn RideRequestBroker>,
}

impl Collaborators {
    /// Single-process collaborators: nothing leaves the process and push
    /// delivery is disabled.
    #[must_use]
    pub fn in_memory(config: &DispatchConfig) -> Self {
        Self {
            store: Arc::new(InMemoryRideStore::new()),
            index: Arc::new(InMemoryDriverIndex::new(config.driver_position_ttl)),
            route_cache: Arc::new(InMemoryRouteCache::new(config.route_quote_ttl)),
            planner: Arc::new(StraightLinePlanner::new(
                config.route_average_speed_kmh,
                config.route_detour_factor,
            )),
            notifier: Arc::new(DisabledNotifier),
            broker: Arc::new(LocalBroker::new(config.event_bus_capacity)),
        }
    }
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ride lifecycle.
    pub rides: Arc<RideService>,
    /// Driver availability and account status.
    pub drivers: Arc<DriverService>,
    /// Heartbeats, nearby lookups and location relay.
    pub locations: Arc<LocationService>,
    /// System of record, for health checks.
    pub store: Arc<dyn RideStore>,
    /// Ride request bus the dispatch relay listens on.
    pub broker: Arc<dyn RideRequestBroker>,
    /// Event bus for WebSocket rooms.
    pub event_bus: EventBus,
    /// Tracked background work, drained on shutdown.
    pub tasks: BackgroundTasks,
    /// Loaded configuration.
    pub config: Arc<DispatchConfig>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Wires services over `collaborators`.
    #[must_use]
    pub fn new(config: DispatchConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            index,
            route_cache,
            planner,
            notifier,
            broker,
        } = collaborators;
        let event_bus = EventBus::new(config.event_bus_capacity);
        let tasks = BackgroundTasks::new();

        let fanout = Fanout::new(
            Arc::clone(&store),
            Arc::clone(&broker),
            Arc::clone(&notifier),
        );
        let rides = RideService::new(
            RideDeps {
                store: Arc::clone(&store),
                index: Arc::clone(&index),
                route_cache,
                planner,
                notifier,
                fanout,
                event_bus: event_bus.clone(),
                tasks: tasks.clone(),
            },
            RideSettings {
                dispatch_radius_km: config.dispatch_radius_km,
                platform_fee_pct: config.platform_fee_pct,
                single_use_tokens: config.route_token_single_use,
                quote_ttl: config.route_quote_ttl,
            },
        );
        let drivers = DriverService::new(Arc::clone(&store), Arc::clone(&index));
        let locations = LocationService::new(index, event_bus.clone());

        Self {
            rides: Arc::new(rides),
            drivers: Arc::new(drivers),
            locations: Arc::new(locations),
            store,
            broker,
            event_bus,
            tasks,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Starts the task that delivers published ride requests to the driver
    /// rooms hosted by this process.
    #[must_use]
    pub fn spawn_dispatch_relay(&self) -> JoinHandle<()> {
        tokio::spawn(run_dispatch_relay(
            Arc::clone(&self.broker),
            Arc::clone(self.locations.index()),
            self.event_bus.clone(),
            self.config.dispatch_radius_km,
        ))
    }
}
