//! BaggageFetcher: find one in `baggage` by PNR. Unlike trips, an absent or
//! unreachable baggage record is never fatal — a passenger list is always
//! enough to synthesize a default allowance table.

use crate::circuit_breaker::CircuitBreaker;
use crate::domain::{Baggage, Pnr};
use crate::fallback_store::FallbackStore;
use crate::metrics_window::Outcome;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct BaggageFetcher {
    store: Arc<dyn DocumentStore>,
    breaker: CircuitBreaker,
    fallback: Arc<FallbackStore>,
    query_timeout: Duration,
    cache_ttl: Duration,
}

impl BaggageFetcher {
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
        format!("baggage:{pnr}")
    }

    /// Always succeeds: the worst case is a synthesized default table.
    pub async fn fetch(&self, pnr: &Pnr, passenger_numbers: &[u32]) -> Baggage {
        if !self.breaker.try_acquire_permission() {
            tracing::warn!(pnr = %pnr, breaker = self.breaker.name(), "call_not_permitted");
            return self.fall_back_or_default(pnr, passenger_numbers, "circuit open".to_string()).await;
        }

        let start = Instant::now();
        let result = tokio::time::timeout(self.query_timeout, self.store.find_baggage(pnr)).await;

        match result {
            Ok(Ok(doc)) => {
                self.breaker.record(Outcome::Success, start.elapsed());
                let baggage = Baggage {
                    booking_reference: doc.booking_reference,
                    allowances: doc.allowances,
                    from_cache: false,
                    from_default: false,
                    baggage_fallback_msg: None,
                };
                self.fallback.put(Self::cache_key(pnr), &baggage, self.cache_ttl).await;
                baggage
            }
            Ok(Err(e)) if e.is_ignored() => {
                self.breaker.record(Outcome::Ignored, start.elapsed());
                self.fall_back_or_default(pnr, passenger_numbers, "no baggage record on file".to_string())
                    .await
            }
            Ok(Err(e)) => {
                self.breaker.record(Outcome::Failure, start.elapsed());
                self.fall_back_or_default(pnr, passenger_numbers, e.to_string()).await
            }
            Err(_elapsed) => {
                self.breaker.record(Outcome::Failure, start.elapsed());
                self.fall_back_or_default(
                    pnr,
                    passenger_numbers,
                    format!("query timed out after {:?}", self.query_timeout),
                )
                .await
            }
        }
    }

    async fn fall_back_or_default(&self, pnr: &Pnr, passenger_numbers: &[u32], cause: String) -> Baggage {
        match self.fallback.get::<Baggage>(&Self::cache_key(pnr)).await {
            Some((mut cached, stored_at)) => {
                cached.from_cache = true;
                cached.baggage_fallback_msg =
                    Some(vec![format!("Baggage data served from cache at {}", stored_at.to_rfc3339())]);
                cached
            }
            None => Baggage::default_for(
                pnr.clone(),
                passenger_numbers,
                format!("Default baggage allowance applied: {cause}"),
            ),
        }
    }
}
