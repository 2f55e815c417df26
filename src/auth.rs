use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    gate, guard,
    models::User,
    repository::RepositoryState,
    roles::{self, Role},
};

pub const SESSION_COOKIE: &str = "session";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// Paths under which a trusted upstream may assert identity through headers.
pub const HEADER_IDENTITY_PREFIX: &str = "/customer";

/// Claims
///
/// Payload of a session token. Only the subject is trusted from the token; role and
/// active flag are re-read from the `users` table on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens are rejected after this timestamp.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Principal
///
/// The authenticated caller, resolved once per request and passed explicitly to every
/// handler. Never mutated while the request is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub active: bool,
}

/// Identity
///
/// Outcome of resolving the caller's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No credential, or one that does not map to an active user.
    Anonymous,
    /// A valid credential whose role is missing or not a recognized role.
    Unrecognized,
    Authenticated(Principal),
}

/// issue_session_token
///
/// Signs a session token for `user_id`, valid for the configured TTL.
pub fn issue_session_token(user_id: Uuid, config: &AppConfig) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + config.session_ttl_secs as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("failed to sign session token: {e}")))
}

/// Validates signature and expiry, returning the claims.
pub fn verify_session_token(
    token: &str,
    secret: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, config: &AppConfig) -> String {
    let secure = if config.env == Env::Production {
        "; Secure"
    } else {
        ""
    };
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{secure}",
        config.session_ttl_secs
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
            })
    })
}

/// resolve_identity
///
/// The single place where credentials become an identity. Both the access gate and the
/// `Principal` extractor go through here.
///
/// 1. Trusted headers (`x-user-id` / `x-user-role`), only when the deployment enables them
///    and only for paths under [`HEADER_IDENTITY_PREFIX`].
/// 2. Session token from the `Authorization` header or the `session` cookie.
/// 3. User lookup: missing or inactive users are anonymous; a stored role that does not
///    parse is unrecognized.
///
/// Only data-store failures are errors; every credential problem is an `Identity`.
pub async fn resolve_identity(
    path: &str,
    headers: &HeaderMap,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Identity, ApiError> {
    if config.trust_identity_headers && gate::path_has_prefix(path, HEADER_IDENTITY_PREFIX) {
        if let Some(raw_id) = headers.get(USER_ID_HEADER) {
            let Some(user_id) = raw_id
                .to_str()
                .ok()
                .and_then(|value| Uuid::parse_str(value.trim()).ok())
            else {
                return Ok(Identity::Anonymous);
            };
            let asserted_role = headers
                .get(USER_ROLE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .unwrap_or_default();
            return asserted_identity(repo, user_id, asserted_role).await;
        }
    }

    let Some(token) = session_token(headers) else {
        return Ok(Identity::Anonymous);
    };
    match verify_session_token(token, &config.session_secret) {
        Ok(claims) => {
            let Some(user) = active_user(repo, claims.sub).await? else {
                return Ok(Identity::Anonymous);
            };
            Ok(match user.role.parse::<Role>() {
                Ok(role) => Identity::Authenticated(Principal {
                    id: user.id,
                    role,
                    active: user.is_active,
                }),
                Err(_) => Identity::Unrecognized,
            })
        }
        Err(e) => {
            tracing::debug!("rejected session token: {:?}", e.kind());
            Ok(Identity::Anonymous)
        }
    }
}

async fn active_user(repo: &RepositoryState, user_id: Uuid) -> Result<Option<User>, ApiError> {
    Ok(repo.get_user(user_id).await?.filter(|user| user.is_active))
}

/// Identity asserted by a trusted upstream. The asserted role must be present, must
/// parse, and may narrow the stored role but never outrank it.
async fn asserted_identity(
    repo: &RepositoryState,
    user_id: Uuid,
    asserted_role: &str,
) -> Result<Identity, ApiError> {
    let Some(user) = active_user(repo, user_id).await? else {
        return Ok(Identity::Anonymous);
    };
    let (Ok(asserted), Ok(stored)) = (asserted_role.parse::<Role>(), user.role.parse::<Role>())
    else {
        return Ok(Identity::Unrecognized);
    };
    if asserted != stored && !roles::is_at_least(stored, asserted) {
        tracing::warn!(
            user_id = %user.id,
            stored = %stored,
            asserted = %asserted,
            "asserted role outranks the stored role"
        );
        return Ok(Identity::Unrecognized);
    }
    Ok(Identity::Authenticated(Principal {
        id: user.id,
        role: asserted,
        active: user.is_active,
    }))
}

/// Principal Extractor Implementation
///
/// Makes `Principal` usable as a handler argument. Reuses the identity the access gate
/// already stored in the request extensions; resolves it here for routes the gate does
/// not cover.
///
/// Rejection: 401 for anonymous or unrecognized identities.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<Identity>() {
            Some(identity) => identity.clone(),
            None => {
                let repo = RepositoryState::from_ref(state);
                let config = AppConfig::from_ref(state);
                // Nested routers see a stripped URI.
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map_or_else(|| parts.uri.path().to_owned(), |uri| uri.0.path().to_owned());
                let identity = resolve_identity(&path, &parts.headers, &repo, &config).await?;
                parts.extensions.insert(identity.clone());
                identity
            }
        };
        guard::authenticated(identity)
    }
}
