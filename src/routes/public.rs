use crate::{
    AppState,
    handlers::{account, catalog},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. None of these paths match a gate prefix.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(catalog::health))
        // POST /auth/signup
        // Creates a CUSTOMER account; 409 when the email is taken.
        .route("/auth/signup", post(account::signup))
        // POST /auth/login
        // Issues a session token (body + HttpOnly cookie).
        .route("/auth/login", post(account::login))
        // POST /auth/logout
        .route("/auth/logout", post(account::logout))
        // GET /stores
        // Active stores only.
        .route("/stores", get(catalog::list_stores))
        // GET /services
        .route("/services", get(catalog::list_services))
}
