use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Bearer-token claims. Identity only; tenant standing is looked up per
/// request from the membership table, never trusted from the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: impl Into<String>, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email: email.into(),
            exp: (now + Duration::hours(ttl_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret is not configured")]
    EmptySecret,

    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// HS256-signed token for the given claims. Token minting belongs to the
/// identity provider; this exists for the admin CLI and tests.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::EmptySecret);
    }
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::EmptySecret);
    }
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
