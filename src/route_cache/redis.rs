//! Redis-backed route cache: `routes:cache:<token>` holds the JSON quote
//! with a key expiry.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::RouteCache;
use crate::domain::{RouteQuote, RouteToken};
use crate::error::DispatchError;

const KEY_PREFIX: &str = "routes:cache:";

fn cache_key(token: RouteToken) -> String {
    format!("{KEY_PREFIX}{token}")
}

fn decode(raw: Option<String>) -> Result<RouteQuote, DispatchError> {
    let raw = raw.ok_or(DispatchError::RouteExpiredOrUnknown)?;
    serde_json::from_str(&raw).map_err(|e| {
        tracing::warn!(error = %e, "unreadable cached route quote");
        DispatchError::RouteExpiredOrUnknown
    })
}

/// [`RouteCache`] backed by plain Redis string keys.
#[derive(Clone)]
pub struct RedisRouteCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl fmt::Debug for RedisRouteCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRouteCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RedisRouteCache {
    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(conn: ConnectionManager, ttl: Duration) -> Self {
        Self { conn, ttl }
    }
}

#[async_trait]
impl RouteCache for RedisRouteCache {
    async fn store(&self, quote: &RouteQuote) -> Result<RouteToken, DispatchError> {
        let payload = serde_json::to_string(quote)
            .map_err(|e| DispatchError::Internal(format!("encode route quote: {e}")))?;
        let token = RouteToken::generate();
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(cache_key(token))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(token)
    }

    async fn fetch(&self, token: RouteToken) -> Result<RouteQuote, DispatchError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(cache_key(token))
            .query_async(&mut conn)
            .await?;
        decode(raw)
    }

    async fn take(&self, token: RouteToken) -> Result<RouteQuote, DispatchError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GETDEL")
            .arg(cache_key(token))
            .query_async(&mut conn)
            .await?;
        decode(raw)
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
