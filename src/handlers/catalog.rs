use axum::{Json, extract::State};

use crate::{
    AppState,
    error::ApiError,
    models::{ServiceKind, ServiceOffering, Store},
    repository::StoreFilter,
};

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// list_stores
///
/// [Public Route] Stores currently accepting orders.
#[utoipa::path(
    get,
    path = "/stores",
    responses((status = 200, description = "Active stores", body = [Store]))
)]
pub async fn list_stores(State(state): State<AppState>) -> Result<Json<Vec<Store>>, ApiError> {
    let stores = state.repo.list_stores(StoreFilter::ActiveOnly).await?;
    Ok(Json(stores))
}

/// list_services
///
/// [Public Route] The service catalog with per-unit prices in cents.
#[utoipa::path(
    get,
    path = "/services",
    responses((status = 200, description = "Service catalog", body = [ServiceOffering]))
)]
pub async fn list_services() -> Json<Vec<ServiceOffering>> {
    Json(
        ServiceKind::ALL
            .into_iter()
            .map(|service| ServiceOffering {
                service,
                unit_price_cents: service.unit_price_cents(),
            })
            .collect(),
    )
}
