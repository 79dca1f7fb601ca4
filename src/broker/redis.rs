//! Redis PUBLISH/SUBSCRIBE broker shared by every process.

use std::fmt;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use redis::aio::ConnectionManager;

use super::{RIDE_REQUESTS_CHANNEL, RideRequestBroker};
use crate::domain::RideRequestEvent;
use crate::error::DispatchError;

/// [`RideRequestBroker`] over a Redis pub/sub channel.
///
/// Publishing goes through the shared connection manager; each subscription
/// opens its own dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisBroker {
    client: redis::Client,
    conn: ConnectionManager,
}

impl fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBroker")
            .field("channel", &RIDE_REQUESTS_CHANNEL)
            .finish_non_exhaustive()
    }
}

impl RedisBroker {
    /// Creates a broker from a client (for subscriptions) and a connection
    /// manager (for publishing).
    #[must_use]
    pub fn new(client: redis::Client, conn: ConnectionManager) -> Self {
        Self { client, conn }
    }
}

fn decode(payload: &str) -> Option<RideRequestEvent> {
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed ride request message");
            None
        }
    }
}

#[async_trait]
impl RideRequestBroker for RedisBroker {
    async fn publish(&self, event: &RideRequestEvent) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| DispatchError::Internal(format!("encode ride request: {e}")))?;
        let mut conn = self.conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(RIDE_REQUESTS_CHANNEL)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        tracing::debug!(ride_id = %event.ride_id, receivers, "ride request published");
        Ok(())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, RideRequestEvent>, DispatchError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(RIDE_REQUESTS_CHANNEL).await?;
        let events = pubsub.into_on_message().filter_map(|msg| async move {
            match msg.get_payload::<String>() {
                Ok(payload) => decode(&payload),
                Err(e) => {
                    tracing::warn!(error = %e, "unreadable pub/sub payload");
                    None
                }
            }
        });
        Ok(events.boxed())
    }
}
