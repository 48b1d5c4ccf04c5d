//! Document-store driver abstraction.
//!
//! `DocumentStore` captures exactly the query shape the source fetchers need
//! against the persisted-state layout (`trips`, `baggage`, `tickets`,
//! `customer_bookings`). [`mongo::MongoDocumentStore`] implements it against
//! real MongoDB collections; [`InMemoryDocumentStore`] implements it over
//! plain maps for tests and for exercising circuit-breaker/fallback behavior
//! on demand.

#[cfg(feature = "mongo")]
pub mod mongo;

use crate::domain::{BaggageAllowance, Flight, Passenger, Pnr};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Raw trip record as persisted in the `trips` collection.
#[derive(Debug, Clone)]
pub struct TripDocument {
    pub booking_reference: Pnr,
    pub cabin_class: String,
    pub passengers: Vec<Passenger>,
    pub flights: Vec<Flight>,
    /// Reserved: present in the persisted-state layout's index but with no
    /// defined meaning. Carried through for completeness, never surfaced.
    pub departure_date: Option<String>,
}

/// Raw baggage record as persisted in the `baggage` collection.
#[derive(Debug, Clone)]
pub struct BaggageDocument {
    pub booking_reference: Pnr,
    pub allowances: Vec<BaggageAllowance>,
}

/// Raw ticket record as persisted in the `tickets` collection.
#[derive(Debug, Clone)]
pub struct TicketDocument {
    pub booking_reference: Pnr,
    pub passenger_number: u32,
    pub ticket_url: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_trip(&self, pnr: &Pnr) -> Result<TripDocument, StoreError>;
    async fn find_baggage(&self, pnr: &Pnr) -> Result<BaggageDocument, StoreError>;
    async fn find_ticket(&self, pnr: &Pnr, passenger_number: u32) -> Result<TicketDocument, StoreError>;
    /// `customer_bookings` reverse index: PNRs a customer appears on. An
    /// unreachable store fails; an unknown customer returns an empty list
    /// (there is no "ignored" distinction on this path).
    async fn find_pnrs_for_customer(&self, customer_id: &str) -> Result<Vec<Pnr>, StoreError>;
}

/// Controls how an in-memory fixture responds to a query, letting tests
/// drive every circuit-breaker/fallback path deterministically.
#[derive(Debug, Clone)]
pub enum Fixture<T> {
    Value(T),
    NotFound,
    Unavailable(String),
}

#[derive(Default)]
struct InMemoryState {
    trips: HashMap<String, Fixture<TripDocument>>,
    baggage: HashMap<String, Fixture<BaggageDocument>>,
    tickets: HashMap<(String, u32), Fixture<TicketDocument>>,
    customer_index: HashMap<String, Fixture<Vec<Pnr>>>,
}

/// In-memory `DocumentStore` fixture for tests: every collection is a map
/// from key to a [`Fixture`] the test controls directly, so a test can flip
/// a PNR from healthy to "store unreachable" mid-run.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_trip(&self, pnr: &Pnr, fixture: Fixture<TripDocument>) {
        self.state.write().await.trips.insert(pnr.as_str().to_string(), fixture);
    }

    pub async fn set_baggage(&self, pnr: &Pnr, fixture: Fixture<BaggageDocument>) {
        self.state.write().await.baggage.insert(pnr.as_str().to_string(), fixture);
    }

    pub async fn set_ticket(&self, pnr: &Pnr, passenger_number: u32, fixture: Fixture<TicketDocument>) {
        self.state
            .write()
            .await
            .tickets
            .insert((pnr.as_str().to_string(), passenger_number), fixture);
    }

    pub async fn set_customer_index(&self, customer_id: &str, fixture: Fixture<Vec<Pnr>>) {
        self.state
            .write()
            .await
            .customer_index
            .insert(customer_id.to_string(), fixture);
    }
}

fn resolve<T: Clone>(fixture: Option<&Fixture<T>>) -> Result<T, StoreError> {
    match fixture {
        Some(Fixture::Value(v)) => Ok(v.clone()),
        Some(Fixture::NotFound) | None => Err(StoreError::NotFound),
        Some(Fixture::Unavailable(cause)) => Err(StoreError::ConnectionFailed(cause.clone())),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_trip(&self, pnr: &Pnr) -> Result<TripDocument, StoreError> {
        let state = self.state.read().await;
        resolve(state.trips.get(pnr.as_str()))
    }

    async fn find_baggage(&self, pnr: &Pnr) -> Result<BaggageDocument, StoreError> {
        let state = self.state.read().await;
        resolve(state.baggage.get(pnr.as_str()))
    }

    async fn find_ticket(&self, pnr: &Pnr, passenger_number: u32) -> Result<TicketDocument, StoreError> {
        let state = self.state.read().await;
        resolve(state.tickets.get(&(pnr.as_str().to_string(), passenger_number)))
    }

    async fn find_pnrs_for_customer(&self, customer_id: &str) -> Result<Vec<Pnr>, StoreError> {
        let state = self.state.read().await;
        match state.customer_index.get(customer_id) {
            Some(Fixture::Value(v)) => Ok(v.clone()),
            Some(Fixture::NotFound) | None => Ok(Vec::new()),
            Some(Fixture::Unavailable(cause)) => Err(StoreError::ConnectionFailed(cause.clone())),
        }
    }
}
