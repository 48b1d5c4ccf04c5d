use super::AppState;
use crate::domain::{CustomerId, Pnr};
use crate::error::{AggError, ErrorBody};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

impl IntoResponse for AggError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AggError::Validation { field, pattern } => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("Bad Request", format!("{field} must match {pattern}")),
            ),
            AggError::PnrNotFound(pnr) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new("Not Found", format!("no booking found for PNR {pnr}")),
            ),
            AggError::SourceUnavailable { pnr, cause } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody::new("Service Unavailable", format!("trip source unavailable for PNR {pnr}: {cause}"))
                    .with_breaker_open(),
            ),
            AggError::Internal(cause) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal Server Error", cause.clone()),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn validation_error(field: &'static str, pattern: &'static str) -> AggError {
    AggError::Validation { field, pattern }
}

pub async fn get_booking(State(state): State<AppState>, Path(pnr): Path<String>) -> Response {
    let pnr = match Pnr::parse(&pnr) {
        Some(pnr) => pnr,
        None => return validation_error("pnr", "^[A-Z0-9]{6}$").into_response(),
    };

    match state.aggregator.aggregate(&pnr).await {
        Ok(booking) => Json(booking).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerBookingsResponse {
    customer_id: String,
    bookings: Vec<crate::domain::BookingResponse>,
    count: usize,
    timestamp: chrono::DateTime<Utc>,
}

pub async fn get_customer_bookings(State(state): State<AppState>, Path(customer_id): Path<String>) -> Response {
    let customer_id = match CustomerId::parse(&customer_id) {
        Some(id) => id,
        None => return validation_error("customerId", "^[A-Za-z0-9]{1,20}$").into_response(),
    };

    match state.aggregator.get_bookings_by_customer_id(&customer_id).await {
        Ok(bookings) => Json(CustomerBookingsResponse {
            customer_id: customer_id.to_string(),
            count: bookings.len(),
            bookings,
            timestamp: Utc::now(),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let breakers: Vec<_> = state
        .breakers
        .iter()
        .map(|b| json!({ "name": b.name(), "state": b.state() }))
        .collect();
    Json(json!({
        "status": "UP",
        "circuitBreakers": breakers,
        "timestamp": Utc::now(),
    }))
}

pub async fn circuit_breakers(State(state): State<AppState>) -> Json<Vec<crate::circuit_breaker::CircuitBreakerMetrics>> {
    Json(state.breakers.iter().map(|b| b.metrics()).collect())
}
