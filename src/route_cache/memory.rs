//! In-process route cache.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::RouteCache;
use crate::domain::{RouteQuote, RouteToken};
use crate::error::DispatchError;

#[derive(Debug)]
struct CachedQuote {
    quote: RouteQuote,
    expires_at: Instant,
}

/// Single-process [`RouteCache`] with lazy expiry.
#[derive(Debug)]
pub struct InMemoryRouteCache {
    quotes: Mutex<HashMap<RouteToken, CachedQuote>>,
    ttl: Duration,
}

impl InMemoryRouteCache {
    /// Creates an empty cache whose quotes live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            quotes: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl RouteCache for InMemoryRouteCache {
    async fn store(&self, quote: &RouteQuote) -> Result<RouteToken, DispatchError> {
        let now = Instant::now();
        let token = RouteToken::generate();
        let mut quotes = self.quotes.lock().await;
        quotes.retain(|_, q| q.expires_at > now);
        quotes.insert(
            token,
            CachedQuote {
                quote: quote.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(token)
    }

    async fn fetch(&self, token: RouteToken) -> Result<RouteQuote, DispatchError> {
        let now = Instant::now();
        self.quotes
            .lock()
            .await
            .get(&token)
            .filter(|q| q.expires_at > now)
            .map(|q| q.quote.clone())
            .ok_or(DispatchError::RouteExpiredOrUnknown)
    }

    async fn take(&self, token: RouteToken) -> Result<RouteQuote, DispatchError> {
        let now = Instant::now();
        self.quotes
            .lock()
            .await
            .remove(&token)
            .filter(|q| q.expires_at > now)
            .map(|q| q.quote)
            .ok_or(DispatchError::RouteExpiredOrUnknown)
    }

    async fn ping(&self) -> Result<(), DispatchError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::domain::{Coordinate, VehicleClass};

    const FIFTEEN_MINUTES: Duration = Duration::from_secs(900);

    fn quote() -> RouteQuote {
        let (Ok(origin), Ok(destination)) =
            (Coordinate::new(12.93, 77.61), Coordinate::new(12.97, 77.59))
        else {
            panic!("valid coordinates");
        };
        RouteQuote {
            polyline: "_p~iF~ps|U".to_string(),
            distance_m: 6200,
            duration_s: 900,
            fare: 163.0,
            vehicle_class: VehicleClass::Car,
            origin,
            destination,
            origin_name: "Koramangala".to_string(),
            destination_name: "MG Road".to_string(),
            external_route_ref: None,
            quoted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn store_then_fetch_returns_same_quote() {
        let cache = InMemoryRouteCache::new(FIFTEEN_MINUTES);
        let q = quote();
        let Ok(token) = cache.store(&q).await else {
            panic!("store failed");
        };
        let Ok(fetched) = cache.fetch(token).await else {
            panic!("fetch failed");
        };
        assert_eq!(fetched, q);
        assert!(cache.fetch(token).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_token_is_expired_or_unknown() {
        let cache = InMemoryRouteCache::new(FIFTEEN_MINUTES);
        let result = cache.fetch(RouteToken::generate()).await;
        assert!(matches!(result, Err(DispatchError::RouteExpiredOrUnknown)));
    }

    #[tokio::test(start_paused = true)]
    async fn quote_expires_after_fifteen_minutes() {
        let cache = InMemoryRouteCache::new(FIFTEEN_MINUTES);
        let Ok(token) = cache.store(&quote()).await else {
            panic!("store failed");
        };

        tokio::time::advance(Duration::from_secs(14 * 60)).await;
        assert!(cache.fetch(token).await.is_ok());

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        let result = cache.fetch(token).await;
        assert!(matches!(result, Err(DispatchError::RouteExpiredOrUnknown)));
    }

    #[tokio::test]
    async fn take_consumes_token() {
        let cache = InMemoryRouteCache::new(FIFTEEN_MINUTES);
        let Ok(token) = cache.store(&quote()).await else {
            panic!("store failed");
        };
        assert!(cache.take(token).await.is_ok());
        assert!(matches!(
            cache.take(token).await,
            Err(DispatchError::RouteExpiredOrUnknown)
        ));
        assert!(matches!(
            cache.fetch(token).await,
            Err(DispatchError::RouteExpiredOrUnknown)
        ));
    }

    #[tokio::test]
    async fn concurrent_take_succeeds_once() {
        let cache = Arc::new(InMemoryRouteCache::new(FIFTEEN_MINUTES));
        let Ok(token) = cache.store(&quote()).await else {
            panic!("store failed");
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.take(token).await.is_ok() })
            })
            .collect();
        let mut successes = 0;
        for handle in handles {
            if matches!(handle.await, Ok(true)) {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
