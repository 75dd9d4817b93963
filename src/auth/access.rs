//! Access tokens: HS256 JWTs binding a user id to an issuer tag.
//!
//! Verification is purely computational (no store lookup), so a token stays
//! valid until its `exp` even if the login session behind it is revoked. The
//! short TTL is the only bound on a leaked token.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AuthError;

/// Issuer tag for access tokens. Any other token class signed with the same
/// secret must use a different tag.
pub const ACCESS_TOKEN_ISSUER: &str = "murmur-access";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    /// User id (UUID string).
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn mint(identity: Uuid, secret: &[u8], ttl: Duration) -> anyhow::Result<String> {
    mint_at(identity, secret, ttl, Utc::now())
}

pub fn mint_at(
    identity: Uuid,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let claims = AccessClaims {
        iss: ACCESS_TOKEN_ISSUER.to_string(),
        sub: identity.to_string(),
        iat: now.timestamp(),
        exp: now
            .checked_add_signed(ttl)
            .context("access token expiry out of range")?
            .timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?;
    Ok(token)
}

pub fn verify(token: &str, secret: &[u8]) -> Result<Uuid, AuthError> {
    verify_at(token, secret, Utc::now())
}

/// Verify signature, expiry, issuer and subject, in that order.
///
/// Expiry is checked here rather than by `jsonwebtoken` so a token is dead
/// exactly at `exp` with no leeway.
pub fn verify_at(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
            _ => AuthError::Malformed,
        })?;
    let claims = data.claims;

    if now.timestamp() >= claims.exp {
        return Err(AuthError::Expired);
    }
    if claims.iss != ACCESS_TOKEN_ISSUER {
        return Err(AuthError::WrongIssuer);
    }

    Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedSubject)
}
