//! Resilient PNR aggregation engine.
//!
//! Given a booking reference (PNR), concurrently fetches trip, baggage, and
//! per-passenger ticket records from a document store, applying a
//! per-dependency circuit breaker and fallback cache to each source, and
//! publishes the outcome to an in-process event bus that streams to
//! WebSocket subscribers. Also supports customer-id reverse lookup.

pub mod aggregator;
pub mod broadcast_bridge;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod fallback_store;
pub mod fetchers;
pub mod http;
pub mod metrics_window;
pub mod store;

pub use aggregator::Aggregator;
pub use broadcast_bridge::BroadcastBridge;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};
pub use config::AppConfig;
pub use error::AggError;
pub use event_bus::EventBus;
pub use store::DocumentStore;
