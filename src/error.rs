//! Unified error taxonomy for the aggregation engine.
//!
//! `AggError` carries the kinds from the error-handling design: validation
//! failures, PNR absence, source unavailability, and an internal catch-all.
//! Degraded responses are not errors — they're a successful [`crate::domain::BookingResponse`]
//! with `status = DEGRADED`.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AggError {
    #[error("{field} must match {pattern}")]
    Validation { field: &'static str, pattern: &'static str },

    #[error("no booking found for PNR {0}")]
    PnrNotFound(String),

    #[error("trip source unavailable for PNR {pnr}: {cause}")]
    SourceUnavailable { pnr: String, cause: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AggError {
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        Self::Internal(cause.to_string())
    }
}

/// Error body shape returned to HTTP clients: `{error, message, timestamp}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_state: Option<&'static str>,
}

impl ErrorBody {
    pub fn new(error: &'static str, message: String) -> Self {
        Self {
            error,
            message,
            timestamp: Utc::now(),
            circuit_breaker_state: None,
        }
    }

    pub fn with_breaker_open(mut self) -> Self {
        self.circuit_breaker_state = Some("OPEN");
        self
    }
}

/// Document-store driver errors, classified before they reach a fetcher's
/// circuit breaker. `NotFound` is the only variant that must be recorded as
/// IGNORED rather than FAILURE.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query timed out after {0}ms")]
    Timeout(u64),

    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Whether this failure is business-logical absence, which circuit
    /// breakers must record as IGNORED rather than FAILURE.
    pub fn is_ignored(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_ignored_other_kinds_are_not() {
        assert!(StoreError::NotFound.is_ignored());
        assert!(!StoreError::ConnectionFailed("refused".into()).is_ignored());
        assert!(!StoreError::Timeout(5000).is_ignored());
    }
}
