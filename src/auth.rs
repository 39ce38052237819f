use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{config::AppConfig, errors::ApiError, models::Role, token};

/// AuthUser
///
/// The resolved identity of an authenticated request: the claims carried by
/// a verified bearer token. No database lookup happens here; the token is
/// self-contained and the role set is read from its claims.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r == role.as_str())
    }
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's `FromRequestParts`, making `AuthUser` usable as a
/// handler argument on any protected route. Extraction is: pull the
/// `Authorization: Bearer` header, verify signature and expiry against the
/// configured secret, expose the embedded claims. Every failure mode
/// (missing header, malformed token, bad signature, expired) is rejected
/// uniformly with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = token::verify_token(token, &config.jwt_secret).ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            roles: claims.roles,
        })
    }
}
