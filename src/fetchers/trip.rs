//! TripFetcher: find one in `trips` by PNR, falling back to the last
//! cached snapshot when the store is unreachable.

use crate::circuit_breaker::CircuitBreaker;
use crate::domain::{Pnr, Trip};
use crate::fallback_store::FallbackStore;
use crate::metrics_window::Outcome;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum TripFetchError {
    PnrNotFound,
    SourceUnavailable { cause: String },
}

pub struct TripFetcher {
    store: Arc<dyn DocumentStore>,
    breaker: CircuitBreaker,
    fallback: Arc<FallbackStore>,
    query_timeout: Duration,
    cache_ttl: Duration,
}

impl TripFetcher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        breaker: CircuitBreaker,
        fallback: Arc<FallbackStore>,
        query_timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            breaker,
            fallback,
            query_timeout,
            cache_ttl,
        }
    }

    fn cache_key(pnr: &Pnr) -> String {
        format!("trip:{pnr}")
    }

    pub async fn fetch(&self, pnr: &Pnr) -> Result<Trip, TripFetchError> {
        if !self.breaker.try_acquire_permission() {
            tracing::warn!(pnr = %pnr, breaker = self.breaker.name(), "call_not_permitted");
            return self.fall_back(pnr, "circuit open".to_string()).await;
        }

        let start = Instant::now();
        let result = tokio::time::timeout(self.query_timeout, self.store.find_trip(pnr)).await;

        match result {
            Ok(Ok(doc)) => {
                self.breaker.record(Outcome::Success, start.elapsed());
                let trip = Trip {
                    booking_reference: doc.booking_reference,
                    cabin_class: doc.cabin_class,
                    passengers: doc.passengers,
                    flights: doc.flights,
                    from_cache: false,
                    cache_timestamp: None,
                    pnr_fallback_msg: None,
                };
                self.fallback.put(Self::cache_key(pnr), &trip, self.cache_ttl).await;
                Ok(trip)
            }
            Ok(Err(e)) if e.is_ignored() => {
                self.breaker.record(Outcome::Ignored, start.elapsed());
                Err(TripFetchError::PnrNotFound)
            }
            Ok(Err(e)) => {
                self.breaker.record(Outcome::Failure, start.elapsed());
                self.fall_back(pnr, e.to_string()).await
            }
            Err(_elapsed) => {
                self.breaker.record(Outcome::Failure, start.elapsed());
                self.fall_back(pnr, format!("query timed out after {:?}", self.query_timeout)).await
            }
        }
    }

    async fn fall_back(&self, pnr: &Pnr, cause: String) -> Result<Trip, TripFetchError> {
        match self.fallback.get::<Trip>(&Self::cache_key(pnr)).await {
            Some((mut cached, stored_at)) => {
                cached.from_cache = true;
                cached.cache_timestamp = Some(stored_at);
                cached.pnr_fallback_msg = Some(vec![format!(
                    "Trip data served from cache at {}",
                    stored_at.to_rfc3339()
                )]);
                Ok(cached)
            }
            None => Err(TripFetchError::SourceUnavailable { cause }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::clock::SystemClock;
    use crate::domain::{Flight, Passenger};
    use crate::store::{Fixture, InMemoryDocumentStore, TripDocument};

    fn sample_trip_doc(pnr: &Pnr) -> TripDocument {
        TripDocument {
            booking_reference: pnr.clone(),
            cabin_class: "ECONOMY".to_string(),
            passengers: vec![Passenger {
                first_name: "Ada".to_string(),
                middle_name: None,
                last_name: "Lovelace".to_string(),
                passenger_number: 1,
                customer_id: None,
                seat: None,
            }],
            flights: vec![Flight {
                flight_number: "AA100".to_string(),
                departure_airport: "JFK".to_string(),
                departure_timestamp: "2026-01-01T10:00:00Z".to_string(),
                arrival_airport: "LAX".to_string(),
                arrival_timestamp: "2026-01-01T13:00:00Z".to_string(),
            }],
            departure_date: None,
        }
    }

    fn fetcher(store: Arc<InMemoryDocumentStore>) -> TripFetcher {
        TripFetcher::new(
            store,
            CircuitBreaker::new("tripService", CircuitBreakerConfig::default(), Arc::new(SystemClock)),
            Arc::new(FallbackStore::new(100)),
            Duration::from_secs(1),
            Duration::from_secs(600),
        )
    }

    #[tokio::test]
    async fn success_populates_fallback_store_for_subsequent_reads() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let pnr = Pnr::parse("GHTW42").unwrap();
        store.set_trip(&pnr, Fixture::Value(sample_trip_doc(&pnr))).await;

        let f = fetcher(store.clone());
        let trip = f.fetch(&pnr).await.unwrap();
        assert!(!trip.from_cache);

        store.set_trip(&pnr, Fixture::Unavailable("connection refused".into())).await;
        let degraded = f.fetch(&pnr).await.unwrap();
        assert!(degraded.from_cache);
        assert!(degraded.pnr_fallback_msg.is_some());
    }

    #[tokio::test]
    async fn unknown_pnr_surfaces_as_not_found_without_tripping_breaker() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let pnr = Pnr::parse("ZZZZ99").unwrap();
        store.set_trip(&pnr, Fixture::NotFound).await;

        let f = fetcher(store);
        let result = f.fetch(&pnr).await;
        assert!(matches!(result, Err(TripFetchError::PnrNotFound)));
        assert_eq!(f.breaker.metrics().buffered_calls, 0);
    }

    #[tokio::test]
    async fn unavailable_with_no_cache_fails_source_unavailable() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let pnr = Pnr::parse("GHTW42").unwrap();
        store.set_trip(&pnr, Fixture::Unavailable("timeout".into())).await;

        let f = fetcher(store);
        let result = f.fetch(&pnr).await;
        assert!(matches!(result, Err(TripFetchError::SourceUnavailable { .. })));
    }
}
