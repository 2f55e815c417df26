//! Access gate.
//!
//! Coarse, path-prefix authorization applied before any handler runs. The prefix table
//! below is the only place the console role lists are declared.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::{Identity, resolve_identity},
    error::ApiError,
    roles::Role,
};

/// Roles a protected prefix accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowed {
    Roles(&'static [Role]),
    /// Any recognized role.
    AnyRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedPrefix {
    pub prefix: &'static str,
    pub allowed: Allowed,
}

/// Evaluated top to bottom; the first matching prefix decides. Most specific first.
pub static PROTECTED_PREFIXES: &[ProtectedPrefix] = &[
    ProtectedPrefix {
        prefix: "/admin/super",
        allowed: Allowed::Roles(&[Role::SuperAdmin]),
    },
    ProtectedPrefix {
        prefix: "/admin/franchise",
        allowed: Allowed::Roles(&[Role::SuperAdmin, Role::FranchiseAdmin]),
    },
    ProtectedPrefix {
        prefix: "/admin/store",
        allowed: Allowed::Roles(&[Role::SuperAdmin, Role::FranchiseAdmin, Role::StoreAdmin]),
    },
    ProtectedPrefix {
        prefix: "/customer",
        allowed: Allowed::AnyRole,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through to the handler.
    Pass,
    Unauthenticated,
    Forbidden,
}

/// Segment-aware prefix test: `/customer` matches `/customer` and `/customer/..`,
/// not `/customers`.
pub(crate) fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn match_prefix(path: &str) -> Option<&'static ProtectedPrefix> {
    PROTECTED_PREFIXES
        .iter()
        .find(|entry| path_has_prefix(path, entry.prefix))
}

/// decide
///
/// Pure function of `(path, identity)`.
pub fn decide(path: &str, identity: &Identity) -> GateDecision {
    let Some(entry) = match_prefix(path) else {
        return GateDecision::Pass;
    };
    match identity {
        Identity::Anonymous => GateDecision::Unauthenticated,
        Identity::Unrecognized => GateDecision::Forbidden,
        Identity::Authenticated(principal) => match entry.allowed {
            Allowed::AnyRole => GateDecision::Pass,
            Allowed::Roles(roles) if roles.contains(&principal.role) => GateDecision::Pass,
            Allowed::Roles(_) => GateDecision::Forbidden,
        },
    }
}

/// access_gate
///
/// Middleware applied to the whole router. Unprotected paths pass without touching the
/// credential. For protected paths the identity is resolved, judged by [`decide`], and
/// stored in the request extensions so the handler's `Principal` extractor reuses it.
pub async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if match_prefix(&path).is_none() {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let identity = match resolve_identity(&path, &parts.headers, &state.repo, &state.config).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    match decide(&path, &identity) {
        GateDecision::Pass => {
            parts.extensions.insert(identity);
            next.run(Request::from_parts(parts, body)).await
        }
        GateDecision::Unauthenticated => {
            tracing::debug!(path = %path, "gate: unauthenticated");
            ApiError::Unauthenticated.into_response()
        }
        GateDecision::Forbidden => {
            tracing::debug!(path = %path, "gate: forbidden");
            ApiError::Forbidden.into_response()
        }
    }
}
