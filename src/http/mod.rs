//! `axum` HTTP surface: request validation and error-to-status mapping live
//! at this boundary so the core never touches an HTTP type.

mod handlers;
mod ws;

use crate::aggregator::Aggregator;
use crate::broadcast_bridge::BroadcastBridge;
use crate::circuit_breaker::CircuitBreaker;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub breakers: Vec<CircuitBreaker>,
    pub broadcast_bridge: Arc<BroadcastBridge>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/booking/{pnr}", get(handlers::get_booking))
        .route("/customer/{customer_id}", get(handlers::get_customer_bookings))
        .route("/health", get(handlers::health))
        .route("/circuitbreakers", get(handlers::circuit_breakers))
        .route("/ws/pnr", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
