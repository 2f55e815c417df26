use crate::{AppState, handlers::rider};
use axum::{
    Router,
    routing::{get, put},
};

/// Rider Router Module
///
/// Delivery riders see and advance only the orders assigned to them.
pub fn rider_routes() -> Router<AppState> {
    Router::new()
        // GET /rider/orders
        .route("/orders", get(rider::list_rider_orders))
        // PUT /rider/orders/{id}/status
        // PICKED_UP, OUT_FOR_DELIVERY or DELIVERED only.
        .route("/orders/{id}/status", put(rider::update_rider_order_status))
}
