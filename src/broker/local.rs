//! Single-process broker over a `tokio::broadcast` channel.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::broadcast;

use super::RideRequestBroker;
use crate::domain::RideRequestEvent;
use crate::error::DispatchError;

/// [`RideRequestBroker`] for deployments with a single process.
#[derive(Debug, Clone)]
pub struct LocalBroker {
    sender: broadcast::Sender<RideRequestEvent>,
}

impl LocalBroker {
    /// Creates a broker buffering up to `capacity` undelivered requests per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

#[async_trait]
impl RideRequestBroker for LocalBroker {
    async fn publish(&self, event: &RideRequestEvent) -> Result<(), DispatchError> {
        // No subscriber means no relay is running; the request is dropped.
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(ride_id = %event.ride_id, "no relay subscribed, ride request dropped");
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, RideRequestEvent>, DispatchError> {
        let rx = self.sender.subscribe();
        let events = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "ride request relay lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(events.boxed())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, RideId, RiderId, VehicleClass};

    fn event() -> RideRequestEvent {
        let Ok(pickup) = Coordinate::new(12.93, 77.61) else {
            panic!("valid coordinate");
        };
        RideRequestEvent {
            ride_id: RideId::new(),
            rider_id: RiderId::new(),
            pickup,
            pickup_name: "Koramangala".to_string(),
            destination: "Indiranagar".to_string(),
            fare: 100.0,
            distance: 1000,
            duration: 300,
            vehicle_class: VehicleClass::Car,
            candidates: Vec::new(),
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_published_event() {
        let broker = LocalBroker::new(16);
        let (Ok(mut a), Ok(mut b)) = (broker.subscribe().await, broker.subscribe().await) else {
            panic!("subscribe failed");
        };
        let sent = event();
        tokio_test::assert_ok!(broker.publish(&sent).await);

        assert_eq!(a.next().await.map(|e| e.ride_id), Some(sent.ride_id));
        assert_eq!(b.next().await.map(|e| e.ride_id), Some(sent.ride_id));
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let broker = LocalBroker::new(16);
        tokio_test::assert_ok!(broker.publish(&event()).await);
    }
}
