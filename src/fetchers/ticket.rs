//! TicketFetcher: find one in `tickets` by (PNR, passenger number). Tickets
//! are never cached — a stale ticket URL is worse than admitting one isn't
//! available right now.

use crate::circuit_breaker::CircuitBreaker;
use crate::domain::{Pnr, Ticket};
use crate::metrics_window::Outcome;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum TicketOutcome {
    Found(Ticket),
    /// No ticket issued yet for this passenger; not an error.
    Absent,
    Failed(String),
}

pub struct TicketFetcher {
    store: Arc<dyn DocumentStore>,
    breaker: CircuitBreaker,
    query_timeout: Duration,
}

impl TicketFetcher {
    pub fn new(store: Arc<dyn DocumentStore>, breaker: CircuitBreaker, query_timeout: Duration) -> Self {
        Self {
            store,
            breaker,
            query_timeout,
        }
    }

    pub async fn fetch(&self, pnr: &Pnr, passenger_number: u32) -> TicketOutcome {
        if !self.breaker.try_acquire_permission() {
            tracing::warn!(pnr = %pnr, passenger_number, breaker = self.breaker.name(), "call_not_permitted");
            return TicketOutcome::Failed("circuit open".to_string());
        }

        let start = Instant::now();
        let result = tokio::time::timeout(self.query_timeout, self.store.find_ticket(pnr, passenger_number)).await;

        match result {
            Ok(Ok(doc)) => {
                self.breaker.record(Outcome::Success, start.elapsed());
                TicketOutcome::Found(Ticket {
                    booking_reference: doc.booking_reference,
                    passenger_number: doc.passenger_number,
                    ticket_url: doc.ticket_url,
                    ticket_fallback_msg: None,
                })
            }
            Ok(Err(e)) if e.is_ignored() => {
                self.breaker.record(Outcome::Ignored, start.elapsed());
                TicketOutcome::Absent
            }
            Ok(Err(e)) => {
                self.breaker.record(Outcome::Failure, start.elapsed());
                TicketOutcome::Failed(e.to_string())
            }
            Err(_elapsed) => {
                self.breaker.record(Outcome::Failure, start.elapsed());
                TicketOutcome::Failed(format!("query timed out after {:?}", self.query_timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::clock::SystemClock;
    use crate::store::{Fixture, InMemoryDocumentStore, TicketDocument};

    fn fetcher(store: Arc<InMemoryDocumentStore>) -> TicketFetcher {
        TicketFetcher::new(
            store,
            CircuitBreaker::new("ticketService", CircuitBreakerConfig::default(), Arc::new(SystemClock)),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn found_ticket_carries_no_fallback_message() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let pnr = Pnr::parse("GHTW42").unwrap();
        store
            .set_ticket(
                &pnr,
                1,
                Fixture::Value(TicketDocument {
                    booking_reference: pnr.clone(),
                    passenger_number: 1,
                    ticket_url: "https://tickets.example/GHTW42/1".to_string(),
                }),
            )
            .await;

        let f = fetcher(store);
        match f.fetch(&pnr, 1).await {
            TicketOutcome::Found(t) => assert!(t.ticket_fallback_msg.is_none()),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_issued_yet_is_absent_not_failed() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let pnr = Pnr::parse("GHTW42").unwrap();
        store.set_ticket(&pnr, 2, Fixture::NotFound).await;

        let f = fetcher(store);
        assert!(matches!(f.fetch(&pnr, 2).await, TicketOutcome::Absent));
        assert_eq!(f.breaker.metrics().buffered_calls, 0);
    }

    #[tokio::test]
    async fn source_unavailable_fails_with_cause() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let pnr = Pnr::parse("GHTW42").unwrap();
        store.set_ticket(&pnr, 1, Fixture::Unavailable("refused".into())).await;

        let f = fetcher(store);
        match f.fetch(&pnr, 1).await {
            TicketOutcome::Failed(cause) => assert!(cause.contains("refused")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
