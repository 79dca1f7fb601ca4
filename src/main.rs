//! ride-dispatch server entry point.
//!
//! Builds the collaborators selected by configuration, starts the Axum
//! HTTP/WebSocket server and the dispatch relay, and drains background
//! work on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use ride_dispatch::api;
use ride_dispatch::app_state::{AppState, Collaborators};
use ride_dispatch::broker::RedisBroker;
use ride_dispatch::config::{DispatchConfig, LogFormat};
use ride_dispatch::index::RedisDriverIndex;
use ride_dispatch::persistence::PostgresRideStore;
use ride_dispatch::push::FcmNotifier;
use ride_dispatch::route_cache::RedisRouteCache;

#[tokio::main]
async fn main() -> Result<()> {
    let config = DispatchConfig::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;
    init_tracing(config.log_format);
    for key in &config.rejected_keys {
        tracing::warn!(key = %key, "invalid configuration value replaced by its default");
    }
    tracing::info!(addr = %config.listen_addr, "starting ride-dispatch");

    let collaborators = build_collaborators(&config).await?;
    let shutdown_grace = config.shutdown_grace;
    let listen_addr = config.listen_addr;

    let state = AppState::new(config, collaborators);
    let relay = state.spawn_dispatch_relay();
    let tasks = state.tasks.clone();
    let app = api::build_app(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .context("failed to bind listen address")?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!(in_flight = tasks.in_flight(), "draining background tasks");
    tasks.drain(shutdown_grace).await;
    relay.abort();
    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ride_dispatch=debug,sqlx=warn"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Picks Redis/PostgreSQL/FCM implementations when configured and falls
/// back to in-process ones otherwise.
async fn build_collaborators(config: &DispatchConfig) -> Result<Collaborators> {
    let mut collaborators = Collaborators::in_memory(config);

    if let Some(redis_url) = &config.redis_url {
        let client = redis::Client::open(redis_url.as_str()).context("invalid REDIS_URL")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("failed to connect to redis")?;
        collaborators.index = Arc::new(RedisDriverIndex::new(
            conn.clone(),
            config.driver_position_ttl,
        ));
        collaborators.route_cache =
            Arc::new(RedisRouteCache::new(conn.clone(), config.route_quote_ttl));
        collaborators.broker = Arc::new(RedisBroker::new(client, conn));
        tracing::info!("using redis for driver index, route cache and broker");
    } else {
        tracing::warn!("REDIS_URL not set, using in-process index, cache and broker");
    }

    if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("failed to connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        collaborators.store = Arc::new(PostgresRideStore::new(pool));
        tracing::info!("database connected, migrations complete");
    } else {
        tracing::warn!("persistence disabled, using in-memory system of record");
    }

    match &config.fcm_server_key {
        Some(key) => {
            collaborators.notifier = Arc::new(FcmNotifier::new(config.fcm_endpoint.clone(), key));
        }
        None => tracing::warn!("FCM_SERVER_KEY not set, push notifications disabled"),
    }

    Ok(collaborators)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
