use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::Principal,
    error::ApiError,
    guard,
    models::{AssignRiderRequest, Order, UpdateOrderStatusRequest},
    roles::{self, Role},
};

use super::{active_user_with_role, staff_order_filter, transition_order};

/// Loads an order and checks the caller's scope covers its store.
async fn order_in_scope(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<Order, ApiError> {
    let order = state
        .repo
        .get_order(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let store = state
        .repo
        .get_store(order.store_id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let scope = guard::store_scope(&state.repo, &store).await?;
    guard::ensure_scope(principal, &scope, "order")?;
    Ok(order)
}

/// list_store_orders
///
/// [Store Console] Orders of every store inside the caller's scope, newest first.
#[utoipa::path(
    get,
    path = "/admin/store/orders",
    responses(
        (status = 200, description = "Orders in scope", body = [Order]),
        (status = 403, description = "Not store staff", body = crate::error::ErrorBody)
    )
)]
pub async fn list_store_orders(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_orders)?;
    let filter = staff_order_filter(&state, &principal).await?;
    Ok(Json(state.repo.list_orders(filter).await?))
}

/// update_order_status
///
/// [Store Console] Moves an order in scope one step along its lifecycle.
///
/// *Errors*: 404 outside the caller's scope, 409 for an invalid edge.
#[utoipa::path(
    put,
    path = "/admin/store/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 404, description = "Not found or out of scope", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody)
    )
)]
pub async fn update_order_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_orders)?;
    let order = order_in_scope(&state, &principal, id).await?;
    let updated = transition_order(&state, &order, payload.status).await?;
    Ok(Json(updated))
}

/// assign_rider
///
/// [Store Console] Hands an open order to an active RIDER account. Reassignment is allowed
/// until the order is delivered or cancelled.
#[utoipa::path(
    put,
    path = "/admin/store/orders/{id}/rider",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = AssignRiderRequest,
    responses(
        (status = 200, description = "Rider assigned", body = Order),
        (status = 400, description = "Not an active rider", body = crate::error::ErrorBody),
        (status = 404, description = "Not found or out of scope", body = crate::error::ErrorBody),
        (status = 409, description = "Order already closed", body = crate::error::ErrorBody)
    )
)]
pub async fn assign_rider(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRiderRequest>,
) -> Result<Json<Order>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_orders)?;
    let order = order_in_scope(&state, &principal, id).await?;
    if order.status.is_terminal() {
        return Err(ApiError::conflict(format!("order is already {}", order.status)));
    }
    active_user_with_role(&state, payload.rider_id, Role::Rider, "rider_id").await?;

    let updated = state
        .repo
        .assign_rider(order.id, payload.rider_id)
        .await?
        .ok_or_else(|| ApiError::conflict("order was closed concurrently"))?;
    tracing::info!(order_id = %updated.id, rider_id = %payload.rider_id, "rider assigned");
    Ok(Json(updated))
}
