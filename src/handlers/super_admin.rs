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
    models::{
        CreateFranchiseRequest, DashboardStats, Franchise, UpdateFranchiseRequest,
        UpdateUserActiveRequest, UpdateUserRoleRequest, UserProfile,
    },
    repository::RepositoryError,
    roles::{self, Role},
};

use super::{active_user_with_role, required, required_if_present};

// --- Franchises ---

/// list_franchises
///
/// [Super Console] Every franchise, active or not.
#[utoipa::path(
    get,
    path = "/admin/super/franchises",
    responses((status = 200, description = "All franchises", body = [Franchise]))
)]
pub async fn list_franchises(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Franchise>>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_franchises)?;
    Ok(Json(state.repo.list_franchises().await?))
}

/// create_franchise
///
/// [Super Console] Creates a franchise owned by an active FRANCHISE_ADMIN account.
#[utoipa::path(
    post,
    path = "/admin/super/franchises",
    request_body = CreateFranchiseRequest,
    responses(
        (status = 201, description = "Franchise created", body = Franchise),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody)
    )
)]
pub async fn create_franchise(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateFranchiseRequest>,
) -> Result<(StatusCode, Json<Franchise>), ApiError> {
    guard::require_capability(&principal, roles::can_manage_franchises)?;
    let req = CreateFranchiseRequest {
        name: required(&payload.name, "name")?,
        owner_id: payload.owner_id,
    };
    active_user_with_role(&state, req.owner_id, Role::FranchiseAdmin, "owner_id").await?;

    let franchise = state.repo.create_franchise(&req).await?;
    tracing::info!(franchise_id = %franchise.id, owner_id = %franchise.owner_id, "franchise created");
    Ok((StatusCode::CREATED, Json(franchise)))
}

/// update_franchise
///
/// [Super Console] Renames, transfers or (de)activates a franchise.
#[utoipa::path(
    put,
    path = "/admin/super/franchises/{id}",
    params(("id" = Uuid, Path, description = "Franchise id")),
    request_body = UpdateFranchiseRequest,
    responses(
        (status = 200, description = "Franchise updated", body = Franchise),
        (status = 404, description = "Not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_franchise(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFranchiseRequest>,
) -> Result<Json<Franchise>, ApiError> {
    guard::require_capability(&principal, roles::can_manage_franchises)?;
    let req = UpdateFranchiseRequest {
        name: required_if_present(payload.name.as_ref(), "name")?,
        owner_id: payload.owner_id,
        is_active: payload.is_active,
    };
    if let Some(owner_id) = req.owner_id {
        active_user_with_role(&state, owner_id, Role::FranchiseAdmin, "owner_id").await?;
    }

    state
        .repo
        .update_franchise(id, &req)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("franchise"))
}

/// delete_franchise
///
/// [Super Console] Deletes an empty franchise. While stores still belong to it the
/// request fails with 409; deactivate it instead.
#[utoipa::path(
    delete,
    path = "/admin/super/franchises/{id}",
    params(("id" = Uuid, Path, description = "Franchise id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Franchise still has stores")
    )
)]
pub async fn delete_franchise(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    guard::require_capability(&principal, roles::can_manage_franchises)?;
    match state.repo.delete_franchise(id).await {
        Ok(true) => {
            tracing::info!(franchise_id = %id, "franchise deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(ApiError::NotFound("franchise")),
        Err(RepositoryError::Conflict(_)) => {
            Err(ApiError::conflict("franchise still has stores"))
        }
        Err(e) => Err(e.into()),
    }
}

// --- Users ---

/// list_users
///
/// [Super Console] Every account, including deactivated ones.
#[utoipa::path(
    get,
    path = "/admin/super/users",
    responses((status = 200, description = "All users", body = [UserProfile]))
)]
pub async fn list_users(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    guard::require_at_least(&principal, Role::SuperAdmin)?;
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// update_user_role
///
/// [Super Console] Changes an account's role. A super admin cannot change their own role,
/// so the console can never lose its last operator through this endpoint.
#[utoipa::path(
    put,
    path = "/admin/super/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserProfile),
        (status = 400, description = "Own account", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_user_role(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    guard::require_at_least(&principal, Role::SuperAdmin)?;
    if id == principal.id {
        return Err(ApiError::validation("you cannot change your own role"));
    }
    let user = state
        .repo
        .set_user_role(id, payload.role)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    tracing::info!(user_id = %id, role = %payload.role, "user role changed");
    Ok(Json(user.into()))
}

/// update_user_active
///
/// [Super Console] Activates or deactivates an account. Deactivated accounts cannot log
/// in and their existing sessions stop resolving.
#[utoipa::path(
    put,
    path = "/admin/super/users/{id}/active",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserActiveRequest,
    responses(
        (status = 200, description = "Flag changed", body = UserProfile),
        (status = 400, description = "Own account", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_user_active(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserActiveRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    guard::require_at_least(&principal, Role::SuperAdmin)?;
    if id == principal.id && !payload.is_active {
        return Err(ApiError::validation("you cannot deactivate your own account"));
    }
    let user = state
        .repo
        .set_user_active(id, payload.is_active)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    tracing::info!(user_id = %id, is_active = payload.is_active, "user active flag changed");
    Ok(Json(user.into()))
}

/// get_stats
///
/// [Super Console] Platform-wide counters for the dashboard.
#[utoipa::path(
    get,
    path = "/admin/super/stats",
    responses((status = 200, description = "Dashboard stats", body = DashboardStats))
)]
pub async fn get_stats(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    guard::require_at_least(&principal, Role::SuperAdmin)?;
    Ok(Json(state.repo.get_stats().await?))
}
