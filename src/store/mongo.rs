//! MongoDB-backed [`DocumentStore`], querying the `trips`, `baggage`,
//! `tickets`, and `customer_bookings` collections named in the
//! persisted-state layout.

use super::{BaggageDocument, DocumentStore, TicketDocument, TripDocument};
use crate::domain::{BaggageAllowance, Flight, Passenger, Pnr};
use crate::error::StoreError;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
    pub server_selection_timeout: Duration,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 27017,
            database: "pnr_agg".to_string(),
            connect_timeout: Duration::from_secs(5),
            socket_timeout: Duration::from_secs(5),
            server_selection_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripBson {
    booking_reference: String,
    cabin_class: String,
    passengers: Vec<PassengerBson>,
    flights: Vec<FlightBson>,
    #[serde(default)]
    departure_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassengerBson {
    first_name: String,
    #[serde(default)]
    middle_name: Option<String>,
    last_name: String,
    passenger_number: u32,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    seat: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlightBson {
    flight_number: String,
    departure_airport: String,
    departure_timestamp: String,
    arrival_airport: String,
    arrival_timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaggageBson {
    booking_reference: String,
    allowances: Vec<AllowanceBson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllowanceBson {
    passenger_number: u32,
    allowance_unit: String,
    checked_allowance_value: f64,
    carry_on_allowance_value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketBson {
    booking_reference: String,
    passenger_number: u32,
    ticket_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerBookingsBson {
    customer_id: String,
    pnrs: Vec<String>,
}

pub struct MongoDocumentStore {
    client: Client,
    database: String,
}

impl MongoDocumentStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        let uri = format!("mongodb://{}:{}", config.host, config.port);
        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.server_selection_timeout);

        let client = Client::with_options(options).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        client
            .database(&config.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            database: config.database.clone(),
        })
    }

    fn trips(&self) -> Collection<TripBson> {
        self.client.database(&self.database).collection("trips")
    }

    fn baggage(&self) -> Collection<BaggageBson> {
        self.client.database(&self.database).collection("baggage")
    }

    fn tickets(&self) -> Collection<TicketBson> {
        self.client.database(&self.database).collection("tickets")
    }

    fn customer_bookings(&self) -> Collection<CustomerBookingsBson> {
        self.client.database(&self.database).collection("customer_bookings")
    }
}

fn map_mongo_err(e: mongodb::error::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

impl TryFrom<TripBson> for TripDocument {
    type Error = StoreError;

    fn try_from(doc: TripBson) -> Result<Self, Self::Error> {
        let booking_reference = Pnr::parse(&doc.booking_reference).ok_or_else(|| {
            StoreError::Query(format!("persisted bookingReference {} is not a valid PNR", doc.booking_reference))
        })?;
        Ok(TripDocument {
            booking_reference,
            cabin_class: doc.cabin_class,
            passengers: doc
                .passengers
                .into_iter()
                .map(|p| Passenger {
                    first_name: p.first_name,
                    middle_name: p.middle_name,
                    last_name: p.last_name,
                    passenger_number: p.passenger_number,
                    customer_id: p.customer_id,
                    seat: p.seat,
                })
                .collect(),
            flights: doc
                .flights
                .into_iter()
                .map(|f| Flight {
                    flight_number: f.flight_number,
                    departure_airport: f.departure_airport,
                    departure_timestamp: f.departure_timestamp,
                    arrival_airport: f.arrival_airport,
                    arrival_timestamp: f.arrival_timestamp,
                })
                .collect(),
            departure_date: doc.departure_date,
        })
    }
}

impl TryFrom<BaggageBson> for BaggageDocument {
    type Error = StoreError;

    fn try_from(doc: BaggageBson) -> Result<Self, Self::Error> {
        use crate::domain::AllowanceUnit;
        let booking_reference = Pnr::parse(&doc.booking_reference).ok_or_else(|| {
            StoreError::Query(format!("persisted bookingReference {} is not a valid PNR", doc.booking_reference))
        })?;
        Ok(BaggageDocument {
            booking_reference,
            allowances: doc
                .allowances
                .into_iter()
                .map(|a| BaggageAllowance {
                    passenger_number: a.passenger_number,
                    allowance_unit: if a.allowance_unit.eq_ignore_ascii_case("lb") {
                        AllowanceUnit::Lb
                    } else {
                        AllowanceUnit::Kg
                    },
                    checked_allowance_value: a.checked_allowance_value,
                    carry_on_allowance_value: a.carry_on_allowance_value,
                })
                .collect(),
        })
    }
}

impl TryFrom<TicketBson> for TicketDocument {
    type Error = StoreError;

    fn try_from(doc: TicketBson) -> Result<Self, Self::Error> {
        let booking_reference = Pnr::parse(&doc.booking_reference).ok_or_else(|| {
            StoreError::Query(format!("persisted bookingReference {} is not a valid PNR", doc.booking_reference))
        })?;
        Ok(TicketDocument {
            booking_reference,
            passenger_number: doc.passenger_number,
            ticket_url: doc.ticket_url,
        })
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find_trip(&self, pnr: &Pnr) -> Result<TripDocument, StoreError> {
        let found = self
            .trips()
            .find_one(doc! { "bookingReference": pnr.as_str() })
            .await
            .map_err(map_mongo_err)?;
        match found {
            Some(doc) => TripDocument::try_from(doc),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_baggage(&self, pnr: &Pnr) -> Result<BaggageDocument, StoreError> {
        let found = self
            .baggage()
            .find_one(doc! { "bookingReference": pnr.as_str() })
            .await
            .map_err(map_mongo_err)?;
        match found {
            Some(doc) => BaggageDocument::try_from(doc),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_ticket(&self, pnr: &Pnr, passenger_number: u32) -> Result<TicketDocument, StoreError> {
        let found = self
            .tickets()
            .find_one(doc! { "bookingReference": pnr.as_str(), "passengerNumber": passenger_number as i32 })
            .await
            .map_err(map_mongo_err)?;
        match found {
            Some(doc) => TicketDocument::try_from(doc),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_pnrs_for_customer(&self, customer_id: &str) -> Result<Vec<Pnr>, StoreError> {
        let found = self
            .customer_bookings()
            .find_one(doc! { "customerId": customer_id })
            .await
            .map_err(map_mongo_err)?;
        Ok(found
            .map(|doc| doc.pnrs.iter().filter_map(|p| Pnr::parse(p)).collect())
            .unwrap_or_default())
    }
}
