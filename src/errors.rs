use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::identity::IdentityError;
use crate::repository::StoreError;
use crate::storage::StorageError;

/// ApiError
///
/// The uniform error surface of the HTTP layer. Domain absence is modeled as
/// `Ok(None)` inside the stores and only becomes `NotFound` here; credential
/// failures are deliberately non-specific so callers cannot tell which half
/// of email/password was wrong.
#[derive(Debug)]
pub enum ApiError {
    InvalidCredentials,
    Unauthorized,
    Forbidden,
    NotFound,
    EmailTaken,
    Validation(String),
    UnresolvedCategory,
    BackendUnavailable,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            ApiError::EmailTaken => (StatusCode::CONFLICT, "Email already registered"),
            ApiError::Validation(msg) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": msg })),
                )
                    .into_response();
            }
            ApiError::UnresolvedCategory => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "One or more categories do not exist",
            ),
            ApiError::BackendUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Backend unavailable")
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnresolvedCategory => ApiError::UnresolvedCategory,
            StoreError::Backend(e) => {
                error!("store backend error: {:?}", e);
                ApiError::BackendUnavailable
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailTaken => ApiError::EmailTaken,
            IdentityError::Backend(e) => {
                error!("identity backend error: {:?}", e);
                ApiError::BackendUnavailable
            }
            IdentityError::Hash(e) => ApiError::Internal(format!("password hashing failed: {e}")),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Internal(format!("storage failure: {err}"))
    }
}
