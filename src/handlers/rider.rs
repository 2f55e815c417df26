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
    models::{Order, OrderStatus, UpdateOrderStatusRequest},
    repository::OrderFilter,
    roles::Role,
};

use super::transition_order;

// Riders are outside the role hierarchy; only the explicit set admits them.
const RIDER_ONLY: &[Role] = &[Role::Rider];

/// list_rider_orders
///
/// [Rider Route] Orders assigned to the calling rider.
#[utoipa::path(
    get,
    path = "/rider/orders",
    responses(
        (status = 200, description = "Assigned orders", body = [Order]),
        (status = 403, description = "Not a rider", body = crate::error::ErrorBody)
    )
)]
pub async fn list_rider_orders(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
    guard::require_roles(&principal, RIDER_ONLY)?;
    let orders = state
        .repo
        .list_orders(OrderFilter::Rider(principal.id))
        .await?;
    Ok(Json(orders))
}

/// update_rider_order_status
///
/// [Rider Route] Reports pickup, departure and delivery on an assigned order. Riders may
/// only set PICKED_UP, OUT_FOR_DELIVERY and DELIVERED; other statuses are 403.
#[utoipa::path(
    put,
    path = "/rider/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 403, description = "Status not settable by riders", body = crate::error::ErrorBody),
        (status = 404, description = "Not assigned to this rider", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody)
    )
)]
pub async fn update_rider_order_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    guard::require_roles(&principal, RIDER_ONLY)?;
    if !OrderStatus::RIDER_SETTABLE.contains(&payload.status) {
        return Err(ApiError::Forbidden);
    }

    let order = state
        .repo
        .get_order(id)
        .await?
        .filter(|order| order.rider_id == Some(principal.id))
        .ok_or(ApiError::NotFound("order"))?;

    let updated = transition_order(&state, &order, payload.status).await?;
    Ok(Json(updated))
}
