use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Claims carried by a session token from the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, expiry_hours: Option<u64>) -> Self {
        let now = Utc::now();
        let expiry_hours = expiry_hours.unwrap_or(config::config().security.session_expiry_hours);
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            email,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// The authenticated principal for a request, as reported by the identity
/// provider.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Session secret not configured")]
    MissingSecret,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Token generation error: {0}")]
    TokenGeneration(String),
}

/// Mint a session token for a known identity. Used by the operator CLI and
/// development tooling; production tokens come from the identity provider.
pub fn issue_session_token(
    user_id: Uuid,
    email: &str,
    expiry_hours: Option<u64>,
) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let claims = Claims::new(user_id, email.to_string(), expiry_hours);
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate a session token and extract its claims. Expired and malformed
/// tokens are the same negative-identity state as far as callers care.
pub fn decode_session_token(token: &str) -> Result<Claims, AuthError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}
