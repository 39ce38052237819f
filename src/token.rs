use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserRecord;

/// Claims
///
/// The payload embedded in every issued bearer token. The token is
/// self-contained: identity, role set, and expiry all travel inside it, and
/// nothing is persisted server-side. Validity is purely a function of the
/// signature and `exp`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's stable UUID.
    pub sub: Uuid,
    pub email: String,
    /// Role names granted at issuance time.
    pub roles: Vec<String>,
    /// Issued-at, seconds since epoch.
    pub iat: usize,
    /// Expiry, seconds since epoch.
    pub exp: usize,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Produces a signed, time-bounded credential binding the identity and its
/// role list. Given valid inputs this has no meaningful failure path; the
/// `Result` only carries the signing backend's theoretical errors upward.
pub fn issue_token(
    user: &UserRecord,
    roles: &[String],
    secret: &str,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expires = now + Duration::hours(ttl_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        roles: roles.to_vec(),
        iat: now.timestamp() as usize,
        exp: expires.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verifies a previously issued credential and extracts its claims. Fails
/// closed: expired, malformed, and signature-mismatched tokens all yield
/// `None` with no further detail.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}
