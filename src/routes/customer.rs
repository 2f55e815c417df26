use crate::{
    AppState,
    handlers::{account, customer},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Customer Router Module
///
/// The customer's own account: profile, address book, orders and wallet. Every handler
/// takes a `Principal`, and ownership is checked against `principal.id`, never against
/// an id supplied in the request.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        // GET /customer/me
        .route("/me", get(account::get_me))
        // GET|POST /customer/addresses
        .route(
            "/addresses",
            get(customer::list_addresses).post(customer::create_address),
        )
        // PUT|DELETE /customer/addresses/{id}
        .route(
            "/addresses/{id}",
            put(customer::update_address).delete(customer::delete_address),
        )
        // POST /customer/addresses/{id}/default
        // Transactional: exactly one default address per customer afterwards.
        .route(
            "/addresses/{id}/default",
            post(customer::set_default_address),
        )
        // GET|POST /customer/orders
        .route(
            "/orders",
            get(customer::list_orders).post(customer::create_order),
        )
        // GET /customer/orders/{id}
        // Visible to the customer, the assigned rider and staff in scope.
        .route("/orders/{id}", get(customer::get_order))
        // POST /customer/orders/{id}/cancel
        // Only before pickup.
        .route("/orders/{id}/cancel", post(customer::cancel_order))
        // GET /customer/wallet
        .route("/wallet", get(customer::get_wallet))
}
