//! Source fetchers: three adapters of identical shape (Trip, Baggage,
//! Ticket), each wrapping one document-store query with its own circuit
//! breaker and fallback policy.

pub mod baggage;
pub mod ticket;
pub mod trip;

pub use baggage::BaggageFetcher;
pub use ticket::{TicketFetcher, TicketOutcome};
pub use trip::{TripFetchError, TripFetcher};
