//! Core data model: PNR, passengers, flights, and the aggregated booking view.
//!
//! Mirrors the wire shapes in the system's persisted-state layout; timestamps
//! on [`Flight`] are carried verbatim as ISO-8601 strings and are never parsed
//! unless a duration or ordering is actually needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 6-character alphanumeric booking identifier (`^[A-Z0-9]{6}$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pnr(String);

impl Pnr {
    /// Parse and validate a PNR string, returning `None` if it doesn't match
    /// `^[A-Z0-9]{6}$`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pnr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer identifier (`^[A-Za-z0-9]{1,20}$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty()
            && raw.len() <= 20
            && raw.chars().all(|c| c.is_ascii_alphanumeric())
        {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub passenger_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub flight_number: String,
    pub departure_airport: String,
    pub departure_timestamp: String,
    pub arrival_airport: String,
    pub arrival_timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub booking_reference: Pnr,
    pub cabin_class: String,
    pub passengers: Vec<Passenger>,
    pub flights: Vec<Flight>,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnr_fallback_msg: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowanceUnit {
    Kg,
    Lb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaggageAllowance {
    pub passenger_number: u32,
    pub allowance_unit: AllowanceUnit,
    pub checked_allowance_value: f64,
    pub carry_on_allowance_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baggage {
    pub booking_reference: Pnr,
    pub allowances: Vec<BaggageAllowance>,
    pub from_cache: bool,
    pub from_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baggage_fallback_msg: Option<Vec<String>>,
}

impl Baggage {
    /// Synthesize a default allowance table: 25kg checked, 7kg carry-on per passenger.
    pub fn default_for(pnr: Pnr, passenger_numbers: &[u32], message: String) -> Self {
        Self {
            booking_reference: pnr,
            allowances: passenger_numbers
                .iter()
                .map(|&passenger_number| BaggageAllowance {
                    passenger_number,
                    allowance_unit: AllowanceUnit::Kg,
                    checked_allowance_value: 25.0,
                    carry_on_allowance_value: 7.0,
                })
                .collect(),
            from_cache: false,
            from_default: true,
            baggage_fallback_msg: Some(vec![message]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub booking_reference: Pnr,
    pub passenger_number: u32,
    pub ticket_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_fallback_msg: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Success,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub pnr: Pnr,
    pub cabin_class: String,
    pub passengers: Vec<Passenger>,
    pub flights: Vec<Flight>,
    pub baggage: Baggage,
    pub tickets: Vec<Ticket>,
    pub status: BookingStatus,
    pub from_cache: bool,
    pub timestamp: DateTime<Utc>,
}
