//! Cross-process fan-out of ride requests.
//!
//! Realtime sessions are pinned to the process that accepted them. When a
//! ride is created, the [`Fanout`](crate::service::Fanout) publishes a
//! [`RideRequestEvent`] through a [`RideRequestBroker`]; every process runs
//! a relay that subscribes and delivers the request to the driver rooms it
//! hosts locally.

pub mod local;
pub mod redis;

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub use self::local::LocalBroker;
pub use self::redis::RedisBroker;
use crate::domain::RideRequestEvent;
use crate::error::DispatchError;

/// Channel name shared by all processes.
pub const RIDE_REQUESTS_CHANNEL: &str = "ride_requests";

/// Publish/subscribe channel for [`RideRequestEvent`]s.
///
/// Delivery is at most once and unordered across publishers. A process that
/// is not subscribed when a message is published never sees it.
#[async_trait]
pub trait RideRequestBroker: Send + Sync + fmt::Debug {
    /// Publishes one request to every subscribed process.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if the broker cannot
    /// be reached.
    async fn publish(&self, event: &RideRequestEvent) -> Result<(), DispatchError>;

    /// Opens a subscription. The stream ends when the broker connection is
    /// lost.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UpstreamUnavailable`] if the subscription
    /// cannot be established.
    async fn subscribe(&self) -> Result<BoxStream<'static, RideRequestEvent>, DispatchError>;
}
