use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// ErrorBody
///
/// The JSON shape of every error response: a stable machine code plus a human message.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// ApiError
///
/// The error taxonomy shared by the gate, the extractors and every handler.
/// Handlers return `Result<_, ApiError>`, so nothing escapes the handler boundary
/// without being mapped to a status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential, or a credential that does not resolve to an active user.
    #[error("authentication required")]
    Unauthenticated,
    /// Valid identity, insufficient role. The message never names the accepted roles.
    #[error("access denied")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    /// Absent, or not visible to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    /// Detail is logged, never returned.
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal(detail.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::Validation(_) => "validation_error",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "request failed with internal error");
        }
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

const CONFLICT_MESSAGE: &str = "operation conflicts with existing data";

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::NotFound("record"),
            RepositoryError::Conflict(constraint) => {
                tracing::debug!(constraint = %constraint, "constraint violation");
                ApiError::conflict(CONFLICT_MESSAGE)
            }
            RepositoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_bodies_do_not_leak_detail() {
        assert_eq!(ApiError::Forbidden.to_string(), "access denied");
        assert_eq!(ApiError::internal("pool timed out").to_string(), "internal server error");
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::validation("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("order").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("dup").status(), StatusCode::CONFLICT);
    }

    #[test]
    fn constraint_names_stay_out_of_conflict_messages() {
        let err = ApiError::from(RepositoryError::Conflict("stores_franchise_id_fkey".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "operation conflicts with existing data");
    }
}
