use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::Principal,
    error::ApiError,
    guard,
    models::{CreateStoreRequest, Order, Store, UpdateStoreRequest},
    repository::StoreFilter,
    roles::{self, Role},
};

use super::{active_user_with_role, required, required_if_present, staff_order_filter};

/// list_franchise_stores
///
/// [Franchise Console] Super admins see every store, franchise admins the stores of the
/// franchises they own (active or not).
#[utoipa::path(
    get,
    path = "/admin/franchise/stores",
    responses((status = 200, description = "Stores in scope", body = [Store]))
)]
pub async fn list_franchise_stores(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Store>>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_stores)?;
    let filter = match principal.role {
        Role::SuperAdmin => StoreFilter::All,
        _ => StoreFilter::FranchiseOwner(principal.id),
    };
    Ok(Json(state.repo.list_stores(filter).await?))
}

/// create_store
///
/// [Franchise Console] Opens a store inside a franchise the caller may manage.
///
/// *Validation*: `admin_id`, when given, must be an active STORE_ADMIN account.
#[utoipa::path(
    post,
    path = "/admin/franchise/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = Store),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody),
        (status = 404, description = "Franchise not found or not owned", body = crate::error::ErrorBody)
    )
)]
pub async fn create_store(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Store>), ApiError> {
    guard::require_capability(&principal, roles::can_manage_stores)?;
    let franchise = state
        .repo
        .get_franchise(payload.franchise_id)
        .await?
        .ok_or(ApiError::NotFound("franchise"))?;
    if principal.role != Role::SuperAdmin {
        guard::ensure_owner(franchise.owner_id, &principal, "franchise")?;
    }

    let req = CreateStoreRequest {
        franchise_id: franchise.id,
        name: required(&payload.name, "name")?,
        address: required(&payload.address, "address")?,
        admin_id: payload.admin_id,
    };
    if let Some(admin_id) = req.admin_id {
        active_user_with_role(&state, admin_id, Role::StoreAdmin, "admin_id").await?;
    }

    let store = state.repo.create_store(&req).await?;
    tracing::info!(store_id = %store.id, franchise_id = %store.franchise_id, "store created");
    Ok((StatusCode::CREATED, Json(store)))
}

/// update_store
///
/// [Franchise Console] Renames, reassigns or (de)activates a store in scope. An inactive
/// store disappears from `GET /stores` and rejects new orders.
#[utoipa::path(
    put,
    path = "/admin/franchise/stores/{id}",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Store updated", body = Store),
        (status = 404, description = "Not found or out of scope", body = crate::error::ErrorBody)
    )
)]
pub async fn update_store(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStoreRequest>,
) -> Result<Json<Store>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_stores)?;
    guard::store_in_scope(&state.repo, &principal, id).await?;

    let req = UpdateStoreRequest {
        name: required_if_present(payload.name.as_ref(), "name")?,
        address: required_if_present(payload.address.as_ref(), "address")?,
        admin_id: payload.admin_id,
        is_active: payload.is_active,
    };
    if let Some(admin_id) = req.admin_id {
        active_user_with_role(&state, admin_id, Role::StoreAdmin, "admin_id").await?;
    }

    state
        .repo
        .update_store(id, &req)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("store"))
}

/// list_franchise_orders
///
/// [Franchise Console] Orders across every store in the caller's franchises.
#[utoipa::path(
    get,
    path = "/admin/franchise/orders",
    responses((status = 200, description = "Orders in scope", body = [Order]))
)]
pub async fn list_franchise_orders(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_stores)?;
    let filter = staff_order_filter(&state, &principal).await?;
    Ok(Json(state.repo.list_orders(filter).await?))
}
