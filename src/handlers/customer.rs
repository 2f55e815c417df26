use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    AppState,
    auth::Principal,
    error::ApiError,
    guard,
    models::{
        self, Address, AddressRequest, CreateOrderRequest, MAX_ITEM_QUANTITY, NewOrder, Order,
        OrderStatus, UpdateAddressRequest, WalletSummary,
    },
    repository::{OrderFilter, RepositoryError},
    roles::{self, Role, Scope},
};

use super::{optional, required, required_if_present, transition_order};

const CUSTOMER_ONLY: &[Role] = &[Role::Customer];

// --- Addresses ---

/// list_addresses
///
/// [Customer Route] The caller's saved addresses, oldest first.
#[utoipa::path(
    get,
    path = "/customer/addresses",
    responses((status = 200, description = "Own addresses", body = [Address]))
)]
pub async fn list_addresses(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Address>>, ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    Ok(Json(state.repo.list_addresses(principal.id).await?))
}

/// create_address
///
/// [Customer Route] Saves a new address. A customer's first address becomes the default,
/// as does any address created with `is_default: true`.
#[utoipa::path(
    post,
    path = "/customer/addresses",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Address created", body = Address),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody)
    )
)]
pub async fn create_address(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    let req = AddressRequest {
        label: required(&payload.label, "label")?,
        line1: required(&payload.line1, "line1")?,
        line2: optional(payload.line2.as_ref()),
        city: required(&payload.city, "city")?,
        postal_code: required(&payload.postal_code, "postal_code")?,
        is_default: payload.is_default,
    };
    let address = state.repo.create_address(principal.id, &req).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// update_address
///
/// [Customer Route] Partial update of an own address. The default flag is changed only
/// through `POST /customer/addresses/{id}/default`.
#[utoipa::path(
    put,
    path = "/customer/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = Address),
        (status = 404, description = "No such address for this customer", body = crate::error::ErrorBody)
    )
)]
pub async fn update_address(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAddressRequest>,
) -> Result<Json<Address>, ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    let req = UpdateAddressRequest {
        label: required_if_present(payload.label.as_ref(), "label")?,
        line1: required_if_present(payload.line1.as_ref(), "line1")?,
        // Empty after trimming clears the line.
        line2: payload.line2.as_ref().map(|line| line.trim().to_string()),
        city: required_if_present(payload.city.as_ref(), "city")?,
        postal_code: required_if_present(payload.postal_code.as_ref(), "postal_code")?,
    };
    state
        .repo
        .update_address(principal.id, id, &req)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("address"))
}

/// delete_address
///
/// [Customer Route] Removes an own address. Addresses referenced by orders are kept (409).
/// Deleting the default leaves the customer without one until they pick another.
#[utoipa::path(
    delete,
    path = "/customer/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such address for this customer"),
        (status = 409, description = "Address is used by an order")
    )
)]
pub async fn delete_address(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    match state.repo.delete_address(principal.id, id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(ApiError::NotFound("address")),
        Err(RepositoryError::Conflict(_)) => {
            Err(ApiError::conflict("address is used by an existing order"))
        }
        Err(e) => Err(e.into()),
    }
}

/// set_default_address
///
/// [Customer Route] Makes one of the caller's addresses the default. Runs as a single
/// transaction: afterwards exactly this address is the default, even when several calls
/// race. A foreign or missing address is a 404 and changes nothing.
#[utoipa::path(
    post,
    path = "/customer/addresses/{id}/default",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "New default address", body = Address),
        (status = 404, description = "No such address for this customer", body = crate::error::ErrorBody)
    )
)]
pub async fn set_default_address(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Address>, ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    match state.repo.set_default_address(principal.id, id).await {
        Ok(address) => Ok(Json(address)),
        Err(RepositoryError::NotFound) => Err(ApiError::NotFound("address")),
        Err(e) => Err(e.into()),
    }
}

// --- Orders ---

/// list_orders
///
/// [Customer Route] The caller's own orders, newest first.
#[utoipa::path(
    get,
    path = "/customer/orders",
    responses((status = 200, description = "Own orders", body = [Order]))
)]
pub async fn list_orders(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    let orders = state
        .repo
        .list_orders(OrderFilter::Customer(principal.id))
        .await?;
    Ok(Json(orders))
}

fn validate_items(req: &CreateOrderRequest) -> Result<(), ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::validation("an order needs at least one item"));
    }
    let mut seen = HashSet::new();
    for item in &req.items {
        if item.quantity == 0 || item.quantity > MAX_ITEM_QUANTITY {
            return Err(ApiError::validation(format!(
                "quantity must be between 1 and {MAX_ITEM_QUANTITY}"
            )));
        }
        if !seen.insert(item.service) {
            return Err(ApiError::validation("each service may appear only once"));
        }
    }
    Ok(())
}

/// create_order
///
/// [Customer Route] Places an order at an active store, for pickup at one of the caller's
/// addresses. The total is computed from the catalog, never taken from the client.
#[utoipa::path(
    post,
    path = "/customer/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = Order),
        (status = 400, description = "Invalid items or inactive store", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown store or address", body = crate::error::ErrorBody)
    )
)]
pub async fn create_order(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    validate_items(&payload)?;

    let store = state
        .repo
        .get_store(payload.store_id)
        .await?
        .ok_or(ApiError::NotFound("store"))?;
    if !store.is_active {
        return Err(ApiError::validation("store is not accepting orders"));
    }
    state
        .repo
        .get_address(principal.id, payload.address_id)
        .await?
        .ok_or(ApiError::NotFound("address"))?;

    let total_cents = models::order_total_cents(&payload.items);
    let order = state
        .repo
        .create_order(NewOrder {
            customer_id: principal.id,
            store_id: store.id,
            address_id: payload.address_id,
            items: payload.items,
            total_cents,
            notes: optional(payload.notes.as_ref()),
        })
        .await?;

    tracing::info!(order_id = %order.id, store_id = %order.store_id, total_cents, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

/// get_order
///
/// [Customer Route] A single order, visible to its customer, its assigned rider and the
/// staff whose scope covers its store. Anyone else gets a 404.
#[utoipa::path(
    get,
    path = "/customer/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 404, description = "Not found or not visible", body = crate::error::ErrorBody)
    )
)]
pub async fn get_order(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .repo
        .get_order(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;

    let scope = if roles::can_manage_orders(principal.role) {
        match state.repo.get_store(order.store_id).await? {
            Some(store) => guard::store_scope(&state.repo, &store).await?,
            None => Scope::default(),
        }
    } else {
        Scope::default()
    };

    if roles::can_view_order(&principal, &order, &scope) {
        Ok(Json(order))
    } else {
        Err(ApiError::NotFound("order"))
    }
}

/// cancel_order
///
/// [Customer Route] Cancels an own order that has not been picked up yet.
#[utoipa::path(
    post,
    path = "/customer/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = Order),
        (status = 404, description = "No such order for this customer", body = crate::error::ErrorBody),
        (status = 409, description = "Order can no longer be cancelled", body = crate::error::ErrorBody)
    )
)]
pub async fn cancel_order(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    let order = state
        .repo
        .get_order(id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    guard::ensure_owner(order.customer_id, &principal, "order")?;

    let cancelled = transition_order(&state, &order, OrderStatus::Cancelled).await?;
    Ok(Json(cancelled))
}

/// get_wallet
///
/// [Customer Route] Wallet stub: zero balance plus loyalty points earned on delivered
/// orders.
#[utoipa::path(
    get,
    path = "/customer/wallet",
    responses((status = 200, description = "Wallet summary", body = WalletSummary))
)]
pub async fn get_wallet(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<WalletSummary>, ApiError> {
    guard::require_roles(&principal, CUSTOMER_ONLY)?;
    let orders = state
        .repo
        .list_orders(OrderFilter::Customer(principal.id))
        .await?;
    Ok(Json(WalletSummary {
        balance_cents: 0,
        loyalty_points: models::loyalty_points(&orders),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderItem, ServiceKind};

    fn request(items: Vec<OrderItem>) -> CreateOrderRequest {
        CreateOrderRequest {
            store_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            items,
            notes: None,
        }
    }

    #[test]
    fn item_rules() {
        assert!(validate_items(&request(vec![])).is_err());
        assert!(
            validate_items(&request(vec![OrderItem { service: ServiceKind::Ironing, quantity: 0 }]))
                .is_err()
        );
        assert!(
            validate_items(&request(vec![OrderItem {
                service: ServiceKind::Ironing,
                quantity: MAX_ITEM_QUANTITY + 1
            }]))
            .is_err()
        );
        assert!(
            validate_items(&request(vec![
                OrderItem { service: ServiceKind::Ironing, quantity: 2 },
                OrderItem { service: ServiceKind::Ironing, quantity: 1 },
            ]))
            .is_err()
        );
        assert!(
            validate_items(&request(vec![
                OrderItem { service: ServiceKind::Ironing, quantity: MAX_ITEM_QUANTITY },
                OrderItem { service: ServiceKind::Bedding, quantity: 1 },
            ]))
            .is_ok()
        );
    }
}
