use axum::{
    Json,
    extract::State,
    http::{HeaderName, StatusCode, header},
};

use crate::{
    AppState,
    auth::{self, Principal},
    error::ApiError,
    models::{LoginRequest, LoginResponse, NewUser, SignupRequest, UserProfile},
    repository::RepositoryError,
    roles::Role,
};

use super::{hash_password, optional, required, verify_password};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Lowercases and checks the shape `local@domain.tld`.
fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(ApiError::validation("email is not a valid address"))
    }
}

/// signup
///
/// [Public Route] Creates a CUSTOMER account. The role is never taken from the request.
/// A second signup with the same email (case-insensitive) is a 409 and creates nothing.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let email = normalize_email(&payload.email)?;
    let name = required(&payload.name, "name")?;
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&state.hasher, payload.password).await?;
    let new_user = NewUser {
        email,
        name,
        phone: optional(payload.phone.as_ref()),
        password_hash,
        role: Role::Customer,
    };

    let user = state.repo.create_user(new_user).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => ApiError::conflict("email is already registered"),
        other => other.into(),
    })?;

    tracing::info!(user_id = %user.id, "customer signed up");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login
///
/// [Public Route] Exchanges email and password for a session. The token is returned in
/// the body and as an HttpOnly `session` cookie. Unknown email, wrong password and
/// deactivated account all produce the same 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<([(HeaderName, String); 1], Json<LoginResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    let Some(user) = state.repo.find_user_by_email(&email).await? else {
        let dummy = state.hasher.dummy_digest().to_string();
        verify_password(&state.hasher, payload.password, dummy).await?;
        tracing::warn!("login failed: unknown email");
        return Err(ApiError::Unauthenticated);
    };

    let matches =
        verify_password(&state.hasher, payload.password, user.password_hash.clone()).await?;
    if !matches {
        tracing::warn!(user_id = %user.id, "login failed: wrong password");
        return Err(ApiError::Unauthenticated);
    }
    if !user.is_active {
        tracing::warn!(user_id = %user.id, "login failed: account deactivated");
        return Err(ApiError::Unauthenticated);
    }

    let token = auth::issue_session_token(user.id, &state.config)?;
    let cookie = auth::session_cookie(&token, &state.config);
    tracing::info!(user_id = %user.id, "session issued");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// logout
///
/// [Public Route] Expires the session cookie. Tokens are stateless, so a Bearer token
/// stays valid until it expires.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session cookie cleared"))
)]
pub async fn logout() -> (StatusCode, [(HeaderName, String); 1]) {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, auth::clear_session_cookie())],
    )
}

/// get_me
///
/// [Customer Route] Returns the caller's own profile.
#[utoipa::path(
    get,
    path = "/customer/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody)
    )
)]
pub async fn get_me(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(principal.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in ["", "ana", "ana@", "@example.com", "ana@example", "ana@.com", "a@b@c.com", "ana@example."] {
            assert!(normalize_email(raw).is_err(), "{raw}");
        }
    }
}
