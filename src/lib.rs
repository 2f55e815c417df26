use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity, authorization and their building blocks.
pub mod auth;
pub mod gate;
pub mod guard;
pub mod password;
pub mod roles;

// Application services.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod repository;

// Routing, one module per console.
pub mod routes;
use routes::{admin, customer, public, rider};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use notify::{LogNotifier, MemoryNotifier, NotifierState, WebhookNotifier};
pub use password::{HasherState, Pbkdf2Hasher};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document assembled from every `#[utoipa::path]` handler and `ToSchema` model,
/// served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::catalog::health, handlers::catalog::list_stores, handlers::catalog::list_services,
        handlers::account::signup, handlers::account::login, handlers::account::logout,
        handlers::account::get_me,
        handlers::customer::list_addresses, handlers::customer::create_address,
        handlers::customer::update_address, handlers::customer::delete_address,
        handlers::customer::set_default_address, handlers::customer::list_orders,
        handlers::customer::create_order, handlers::customer::get_order,
        handlers::customer::cancel_order, handlers::customer::get_wallet,
        handlers::store::list_store_orders, handlers::store::update_order_status,
        handlers::store::assign_rider,
        handlers::franchise::list_franchise_stores, handlers::franchise::create_store,
        handlers::franchise::update_store, handlers::franchise::list_franchise_orders,
        handlers::super_admin::list_franchises, handlers::super_admin::create_franchise,
        handlers::super_admin::update_franchise, handlers::super_admin::delete_franchise,
        handlers::super_admin::list_users, handlers::super_admin::update_user_role,
        handlers::super_admin::update_user_active, handlers::super_admin::get_stats,
        handlers::rider::list_rider_orders, handlers::rider::update_rider_order_status,
    ),
    components(
        schemas(
            error::ErrorBody, roles::Role,
            models::Franchise, models::Store, models::Address, models::ServiceKind,
            models::ServiceOffering, models::OrderStatus, models::OrderItem, models::Order,
            models::SignupRequest, models::LoginRequest, models::LoginResponse,
            models::AddressRequest, models::UpdateAddressRequest, models::CreateOrderRequest,
            models::UpdateOrderStatusRequest, models::AssignRiderRequest,
            models::CreateFranchiseRequest, models::UpdateFranchiseRequest,
            models::CreateStoreRequest, models::UpdateStoreRequest,
            models::UpdateUserRoleRequest, models::UpdateUserActiveRequest,
            models::UserProfile, models::StatusCount, models::DashboardStats,
            models::WalletSummary,
        )
    ),
    tags(
        (name = "laundry-hub", description = "Multi-tenant laundry service API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, cloneable container for every collaborator a handler may need. Each field is
/// an `Arc` (or cheap to clone), so cloning per request is fine.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub notifier: NotifierState,
    pub hasher: HasherState,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state for tests and `DATABASE_URL=memory` runs.
    pub fn in_memory(config: AppConfig) -> Self {
        let hasher = Pbkdf2Hasher::new(config.password_hash_iterations);
        Self {
            repo: std::sync::Arc::new(MemoryRepository::new()),
            notifier: std::sync::Arc::new(LogNotifier),
            hasher: std::sync::Arc::new(hasher),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors (notably `Principal`) pull single collaborators out of `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for NotifierState {
    fn from_ref(app_state: &AppState) -> NotifierState {
        app_state.notifier.clone()
    }
}

impl FromRef<AppState> for HasherState {
    fn from_ref(app_state: &AppState) -> HasherState {
        app_state.hasher.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing tree, puts the access gate in front of every route, and wraps
/// the result in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/customer", customer::customer_routes())
        .nest("/admin", admin::admin_routes())
        .nest("/rider", rider::rider_routes())
        // The gate sees the full request path, so it is layered after nesting.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::access_gate,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, uri and the request id set by `SetRequestIdLayer`, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
