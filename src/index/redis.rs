//! Redis-backed driver index shared by every process.
//!
//! # Layout
//!
//! - `drivers:geo` — GEO sorted set, member = driver id.
//! - `drivers:data:<id>` — JSON [`DriverPosition`] with a TTL.
//!
//! GEO members cannot expire individually, so the metadata key carries the
//! expiry. A member whose metadata key is gone is treated as expired: it is
//! left out of query results and removed from the GEO set lazily.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{DriverIndex, validate_radius};
use crate::domain::{Coordinate, DriverId, DriverPosition, NearbyDriver};
use crate::error::DispatchError;

const GEO_KEY: &str = "drivers:geo";
const DATA_PREFIX: &str = "drivers:data:";

fn data_key(driver_id: DriverId) -> String {
    format!("{DATA_PREFIX}{driver_id}")
}

/// [`DriverIndex`] over a Redis GEO set.
#[derive(Clone)]
pub struct RedisDriverIndex {
    conn: ConnectionManager,
    ttl: Duration,
}

impl fmt::Debug for RedisDriverIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisDriverIndex")
            .field("geo_key", &GEO_KEY)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RedisDriverIndex {
    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(conn: ConnectionManager, ttl: Duration) -> Self {
        Self { conn, ttl }
    }

    async fn purge_members(&self, stale: &[String]) {
        if stale.is_empty() {
            return;
        }
        let mut conn = self.conn.clone();
        let result: Result<(), redis::RedisError> = redis::cmd("ZREM")
            .arg(GEO_KEY)
            .arg(stale)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, count = stale.len(), "failed to purge expired geo members");
        }
    }
}

#[async_trait]
impl DriverIndex for RedisDriverIndex {
    async fn update_position(&self, position: DriverPosition) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(&position)
            .map_err(|e| DispatchError::Internal(format!("encode driver position: {e}")))?;
        let member = position.driver_id.to_string();

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("GEOADD")
            .arg(GEO_KEY)
            .arg(position.coordinate.longitude)
            .arg(position.coordinate.latitude)
            .arg(&member)
            .ignore()
            .cmd("SET")
            .arg(data_key(position.driver_id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove_driver(&self, driver_id: DriverId) -> Result<(), DispatchError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("ZREM")
            .arg(GEO_KEY)
            .arg(driver_id.to_string())
            .ignore()
            .cmd("DEL")
            .arg(data_key(driver_id))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn query_nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<NearbyDriver>, DispatchError> {
        validate_radius(radius_km)?;
        let mut conn = self.conn.clone();

        // Each hit is [member, distance, [longitude, latitude]].
        let hits: Vec<(String, f64, (f64, f64))> = redis::cmd("GEOSEARCH")
            .arg(GEO_KEY)
            .arg("FROMLONLAT")
            .arg(center.longitude)
            .arg(center.latitude)
            .arg("BYRADIUS")
            .arg(radius_km)
            .arg("km")
            .arg("ASC")
            .arg("WITHCOORD")
            .arg("WITHDIST")
            .query_async(&mut conn)
            .await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = hits
            .iter()
            .map(|(member, _, _)| format!("{DATA_PREFIX}{member}"))
            .collect();
        let metadata: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut nearby = Vec::with_capacity(hits.len());
        let mut stale = Vec::new();
        for ((member, distance_km, (lng, lat)), raw) in hits.into_iter().zip(metadata) {
            let Some(raw) = raw else {
                stale.push(member);
                continue;
            };
            let position: DriverPosition = match serde_json::from_str(&raw) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(driver = %member, error = %e, "unreadable driver metadata");
                    continue;
                }
            };
            // The GEO set is authoritative for the coordinate; fall back to
            // the metadata copy if the reply is outside the valid range.
            let coordinate = Coordinate::new(lat, lng).unwrap_or(position.coordinate);
            nearby.push(NearbyDriver {
                driver_id: position.driver_id,
                coordinate,
                distance_km,
                session_id: position.session_id,
            });
        }

        self.purge_members(&stale).await;
        Ok(nearby)
    }

    async fn position(&self, driver_id: DriverId) -> Result<Option<DriverPosition>, DispatchError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(data_key(driver_id))
            .query_async(&mut conn)
            .await?;
        raw.map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| DispatchError::Internal(format!("decode driver position: {e}")))
        })
        .transpose()
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
