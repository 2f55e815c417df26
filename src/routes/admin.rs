use crate::{
    AppState,
    handlers::{franchise, store, super_admin},
};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// The three staff consoles. The access gate rejects callers outside each console's role
/// set before these handlers run; the handlers then repeat the role check and apply the
/// caller's store or franchise scope.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .nest("/store", store_console())
        .nest("/franchise", franchise_console())
        .nest("/super", super_console())
}

/// /admin/store: STORE_ADMIN and above.
fn store_console() -> Router<AppState> {
    Router::new()
        // GET /admin/store/orders
        .route("/orders", get(store::list_store_orders))
        // PUT /admin/store/orders/{id}/status
        // One lifecycle step at a time; 409 on an invalid edge.
        .route("/orders/{id}/status", put(store::update_order_status))
        // PUT /admin/store/orders/{id}/rider
        .route("/orders/{id}/rider", put(store::assign_rider))
}

/// /admin/franchise: FRANCHISE_ADMIN and SUPER_ADMIN.
fn franchise_console() -> Router<AppState> {
    Router::new()
        // GET|POST /admin/franchise/stores
        .route(
            "/stores",
            get(franchise::list_franchise_stores).post(franchise::create_store),
        )
        // PUT /admin/franchise/stores/{id}
        .route("/stores/{id}", put(franchise::update_store))
        // GET /admin/franchise/orders
        .route("/orders", get(franchise::list_franchise_orders))
}

/// /admin/super: SUPER_ADMIN only.
fn super_console() -> Router<AppState> {
    Router::new()
        // GET|POST /admin/super/franchises
        .route(
            "/franchises",
            get(super_admin::list_franchises).post(super_admin::create_franchise),
        )
        // PUT|DELETE /admin/super/franchises/{id}
        // Delete fails with 409 while stores reference the franchise.
        .route(
            "/franchises/{id}",
            put(super_admin::update_franchise).delete(super_admin::delete_franchise),
        )
        // GET /admin/super/users
        .route("/users", get(super_admin::list_users))
        // PUT /admin/super/users/{id}/role
        .route("/users/{id}/role", put(super_admin::update_user_role))
        // PUT /admin/super/users/{id}/active
        .route("/users/{id}/active", put(super_admin::update_user_active))
        // GET /admin/super/stats
        .route("/stats", get(super_admin::get_stats))
}
