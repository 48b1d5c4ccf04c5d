//! Orchestrates the three source fetchers into one [`BookingResponse`],
//! publishes the outcome, and supports customer-id reverse lookup.

use crate::domain::{Baggage, BookingResponse, BookingStatus, CustomerId, Pnr};
use crate::error::AggError;
use crate::event_bus::{EventBus, PnrFetchedEvent};
use crate::fetchers::{BaggageFetcher, TicketFetcher, TicketOutcome, TripFetchError, TripFetcher};
use crate::store::DocumentStore;
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;

pub struct Aggregator {
    store: Arc<dyn DocumentStore>,
    trip_fetcher: TripFetcher,
    baggage_fetcher: BaggageFetcher,
    ticket_fetcher: TicketFetcher,
    event_bus: Arc<EventBus>,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        trip_fetcher: TripFetcher,
        baggage_fetcher: BaggageFetcher,
        ticket_fetcher: TicketFetcher,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            trip_fetcher,
            baggage_fetcher,
            ticket_fetcher,
            event_bus,
        }
    }

    #[tracing::instrument(skip(self), fields(pnr = %pnr))]
    pub async fn aggregate(&self, pnr: &Pnr) -> Result<BookingResponse, AggError> {
        let (trip_result, baggage) = tokio::join!(self.trip_fetcher.fetch(pnr), {
            let passenger_numbers: Vec<u32> = Vec::new();
            // Baggage doesn't know passenger numbers until Trip resolves, but
            // it runs concurrently with Trip rather than waiting on it: fetch
            // against an empty default set and backfill the default table's
            // shape once Trip is known, if a default was actually needed.
            self.baggage_fetcher.fetch(pnr, &passenger_numbers)
        });

        let trip = match trip_result {
            Ok(trip) => trip,
            Err(TripFetchError::PnrNotFound) => {
                return Err(AggError::PnrNotFound(pnr.to_string()));
            }
            Err(TripFetchError::SourceUnavailable { cause }) => {
                return Err(AggError::SourceUnavailable {
                    pnr: pnr.to_string(),
                    cause,
                });
            }
        };

        let passenger_numbers: Vec<u32> = trip.passengers.iter().map(|p| p.passenger_number).collect();
        let baggage = if baggage.from_default && baggage.allowances.len() != passenger_numbers.len() {
            // The concurrent baggage fetch ran before Trip's passenger list was
            // known; re-synthesize the default table for the real roster
            // instead of re-querying the (already-failing) source.
            let message = baggage
                .baggage_fallback_msg
                .and_then(|mut m| m.pop())
                .unwrap_or_else(|| "Default baggage allowance applied".to_string());
            Baggage::default_for(pnr.clone(), &passenger_numbers, message)
        } else {
            baggage
        };

        let ticket_outcomes = join_all(
            passenger_numbers
                .iter()
                .map(|&passenger_number| self.ticket_fetcher.fetch(pnr, passenger_number)),
        )
        .await;

        let mut tickets = Vec::new();
        let mut any_ticket_degraded = false;
        for outcome in ticket_outcomes {
            match outcome {
                TicketOutcome::Found(ticket) => tickets.push(ticket),
                TicketOutcome::Absent => {}
                TicketOutcome::Failed(cause) => {
                    any_ticket_degraded = true;
                    tracing::warn!(pnr = %pnr, cause, "ticket_fetch_degraded");
                }
            }
        }
        tickets.sort_by_key(|t| t.passenger_number);
        let degraded = trip.from_cache || baggage.from_cache || baggage.from_default || any_ticket_degraded;

        let status = if degraded { BookingStatus::Degraded } else { BookingStatus::Success };
        let from_cache = trip.from_cache;

        let response = BookingResponse {
            pnr: pnr.clone(),
            cabin_class: trip.cabin_class,
            passengers: trip.passengers,
            flights: trip.flights,
            baggage,
            tickets,
            status,
            from_cache,
            timestamp: Utc::now(),
        };

        self.event_bus.publish(
            "pnr.fetched",
            PnrFetchedEvent {
                pnr: pnr.to_string(),
                status: match status {
                    BookingStatus::Success => "SUCCESS",
                    BookingStatus::Degraded => "DEGRADED",
                },
                timestamp: response.timestamp.timestamp_millis(),
            },
        );

        Ok(response)
    }

    #[tracing::instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_bookings_by_customer_id(&self, customer_id: &CustomerId) -> Result<Vec<BookingResponse>, AggError> {
        let pnrs = self
            .store
            .find_pnrs_for_customer(customer_id.as_str())
            .await
            .map_err(AggError::internal)?;

        if pnrs.is_empty() {
            return Ok(Vec::new());
        }

        let results = join_all(pnrs.iter().map(|pnr| self.aggregate(pnr))).await;

        let mut bookings = Vec::new();
        let mut all_unavailable = true;
        let mut last_cause = String::new();
        for result in results {
            match result {
                Ok(booking) => {
                    all_unavailable = false;
                    bookings.push(booking);
                }
                Err(AggError::PnrNotFound(_)) => {
                    all_unavailable = false;
                }
                Err(AggError::SourceUnavailable { cause, .. }) => {
                    last_cause = cause;
                }
                Err(other) => return Err(other),
            }
        }

        if bookings.is_empty() && all_unavailable && !pnrs.is_empty() {
            return Err(AggError::SourceUnavailable {
                pnr: customer_id.to_string(),
                cause: last_cause,
            });
        }

        Ok(bookings)
    }
}
