//! In-process driver index with lazy expiry.
//!
//! Positions live in a `RwLock<HashMap<..>>`. Expiry is enforced by the index
//! itself: expired entries are invisible to every read and are swept out
//! periodically on the write path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{DriverIndex, validate_radius};
use crate::domain::{Coordinate, DriverId, DriverPosition, NearbyDriver};
use crate::error::DispatchError;

/// Writes between two sweeps of expired entries.
const SWEEP_EVERY_WRITES: u64 = 256;

#[derive(Debug)]
struct IndexedPosition {
    position: DriverPosition,
    expires_at: Instant,
}

/// Single-process [`DriverIndex`].
///
/// # Concurrency
///
/// - Radius queries take the read lock and run concurrently.
/// - Heartbeats take the write lock briefly; no I/O happens under it.
#[derive(Debug)]
pub struct InMemoryDriverIndex {
    entries: RwLock<HashMap<DriverId, IndexedPosition>>,
    ttl: Duration,
    writes: AtomicU64,
}

impl InMemoryDriverIndex {
    /// Creates an empty index whose entries expire `ttl` after their last
    /// heartbeat.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            writes: AtomicU64::new(0),
        }
    }

    /// Returns the number of unexpired entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// Returns `true` if no unexpired entry exists.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DriverIndex for InMemoryDriverIndex {
    async fn update_position(&self, position: DriverPosition) -> Result<(), DispatchError> {
        let now = Instant::now();
        let expires_at = now + self.ttl;
        let sweep = self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY_WRITES == 0;

        let mut map = self.entries.write().await;
        if sweep {
            map.retain(|_, e| e.expires_at > now);
        }
        map.insert(
            position.driver_id,
            IndexedPosition {
                position,
                expires_at,
            },
        );
        Ok(())
    }

    async fn remove_driver(&self, driver_id: DriverId) -> Result<(), DispatchError> {
        self.entries.write().await.remove(&driver_id);
        Ok(())
    }

    async fn query_nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<NearbyDriver>, DispatchError> {
        validate_radius(radius_km)?;
        let now = Instant::now();

        let map = self.entries.read().await;
        let mut nearby: Vec<NearbyDriver> = map
            .values()
            .filter(|e| e.expires_at > now)
            .filter_map(|e| {
                let distance_km = center.distance_km(&e.position.coordinate);
                (distance_km <= radius_km).then(|| NearbyDriver {
                    driver_id: e.position.driver_id,
                    coordinate: e.position.coordinate,
                    distance_km,
                    session_id: e.position.session_id,
                })
            })
            .collect();
        drop(map);

        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }

    async fn position(&self, driver_id: DriverId) -> Result<Option<DriverPosition>, DispatchError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(&driver_id)
            .filter(|e| e.expires_at > now)
            .map(|e| e.position.clone()))
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
