//! Short-lived cache of priced route quotes keyed by opaque tokens.
//!
//! A quote is stored once by the estimate step and redeemed by ride
//! creation. After the TTL elapses the token resolves to
//! [`DispatchError::RouteExpiredOrUnknown`], exactly as an unknown token does.

pub mod memory;
pub mod redis;

use std::fmt;

use async_trait::async_trait;

pub use self::memory::InMemoryRouteCache;
pub use self::redis::RedisRouteCache;
use crate::domain::{RouteQuote, RouteToken};
use crate::error::DispatchError;

/// Token-addressed quote storage with a fixed expiry.
#[async_trait]
pub trait RouteCache: Send + Sync + fmt::Debug {
    /// Stores `quote` under a freshly generated token.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if the cache cannot be
    /// reached.
    async fn store(&self, quote: &RouteQuote) -> Result<RouteToken, DispatchError>;

    /// Returns the quote for `token` without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RouteExpiredOrUnknown`] for a missing or
    /// expired token, or [`DispatchError::UpstreamUnavailable`].
    async fn fetch(&self, token: RouteToken) -> Result<RouteQuote, DispatchError>;

    /// Atomically returns and deletes the quote for `token`.
    ///
    /// Of two concurrent calls with the same token, at most one succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`RouteCache::fetch`].
    async fn take(&self, token: RouteToken) -> Result<RouteQuote, DispatchError>;

    /// Checks the cache is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if it is not.
    async fn ping(&self) -> Result<(), DispatchError>;
}
