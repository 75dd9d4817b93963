//! Refresh tokens: opaque 256-bit random strings whose validity lives
//! entirely in the store.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::store::{NewRefreshToken, Store};

const REFRESH_TOKEN_BYTES: usize = 32;

/// 32 random bytes from the OS, hex-encoded (64 chars).
pub fn generate() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Mint and persist a refresh token for `identity`.
pub async fn create(store: &dyn Store, identity: Uuid, ttl: Duration) -> anyhow::Result<String> {
    let token = generate();
    let record = NewRefreshToken {
        token: token.clone(),
        user_id: identity,
        expires_at: Utc::now()
            .checked_add_signed(ttl)
            .context("refresh token expiry out of range")?,
    };
    if !store.create_refresh_token(&record).await? {
        anyhow::bail!("refresh token key collision");
    }
    Ok(token)
}

/// Owning identity of an active token. Unknown, revoked and expired tokens
/// all come back as `None`.
pub async fn lookup_active_identity(
    store: &dyn Store,
    token: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<Uuid>> {
    store.find_active_refresh_token(token, now).await
}

/// `false` when the token is unknown or already revoked.
pub async fn revoke(store: &dyn Store, token: &str) -> anyhow::Result<bool> {
    store.revoke_refresh_token(token).await
}
