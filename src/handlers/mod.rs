//! HTTP handlers, grouped by console.
//!
//! Every handler returns `Result<_, ApiError>`. Role checks happen first, before any
//! repository call that could leak the existence of a record.

pub mod account;
pub mod catalog;
pub mod customer;
pub mod franchise;
pub mod rider;
pub mod store;
pub mod super_admin;

use crate::{
    AppState,
    auth::Principal,
    error::ApiError,
    models::{Order, OrderStatus, User},
    notify::OrderEvent,
    password::HasherState,
    repository::{OrderFilter, StoreFilter},
    roles::Role,
};

/// Trims a required text field, rejecting blank values.
pub(crate) fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Same as [`required`] for fields of a partial update.
pub(crate) fn required_if_present(
    value: Option<&String>,
    field: &str,
) -> Result<Option<String>, ApiError> {
    value.map(|v| required(v, field)).transpose()
}

/// Blank optional text is stored as absent.
pub(crate) fn optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Hashing is CPU-bound, so it runs off the async workers.
pub(crate) async fn hash_password(
    hasher: &HasherState,
    password: String,
) -> Result<String, ApiError> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| ApiError::internal(format!("password hashing task failed: {e}")))
}

pub(crate) async fn verify_password(
    hasher: &HasherState,
    password: String,
    digest: String,
) -> Result<bool, ApiError> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
        .await
        .map_err(|e| ApiError::internal(format!("password verification task failed: {e}")))
}

/// Loads a user that must exist, be active and hold `role`. Used for every field that
/// references another account (franchise owner, store admin, rider).
pub(crate) async fn active_user_with_role(
    state: &AppState,
    user_id: uuid::Uuid,
    role: Role,
    field: &str,
) -> Result<User, ApiError> {
    let user = state.repo.get_user(user_id).await?;
    match user {
        Some(user) if user.is_active && user.role == role.as_str() => Ok(user),
        _ => Err(ApiError::validation(format!(
            "{field} must reference an active {role} user"
        ))),
    }
}

/// The orders a staff principal may see: all of them for super admins, otherwise the
/// orders of the stores they run or own.
pub(crate) async fn staff_order_filter(
    state: &AppState,
    principal: &Principal,
) -> Result<OrderFilter, ApiError> {
    let stores = match principal.role {
        Role::SuperAdmin => return Ok(OrderFilter::All),
        Role::FranchiseAdmin => {
            state
                .repo
                .list_stores(StoreFilter::FranchiseOwner(principal.id))
                .await?
        }
        Role::StoreAdmin => {
            state
                .repo
                .list_stores(StoreFilter::StoreAdmin(principal.id))
                .await?
        }
        Role::Customer | Role::Rider => return Err(ApiError::Forbidden),
    };
    Ok(OrderFilter::Stores(stores.into_iter().map(|s| s.id).collect()))
}

/// transition_order
///
/// Moves an order along one lifecycle edge and emits the notifier event. The update is a
/// compare-and-set on the current status, so a concurrent change surfaces as a conflict
/// instead of being overwritten.
pub(crate) async fn transition_order(
    state: &AppState,
    order: &Order,
    next: OrderStatus,
) -> Result<Order, ApiError> {
    if !order.status.can_transition_to(next) {
        return Err(ApiError::conflict(format!(
            "order cannot move from {} to {}",
            order.status, next
        )));
    }

    let updated = state
        .repo
        .update_order_status(order.id, order.status, next)
        .await?
        .ok_or_else(|| ApiError::conflict("order was modified concurrently"))?;

    tracing::info!(order_id = %updated.id, from = %order.status, to = %next, "order status changed");
    state
        .notifier
        .order_status_changed(&OrderEvent::from(&updated))
        .await;
    Ok(updated)
}
