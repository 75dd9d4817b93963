//! Login, refresh and revocation.
//!
//! Per login: NO_SESSION --login--> ACTIVE --revoke--> REVOKED. Each login
//! creates a fresh refresh-token record; refresh never rotates or extends it.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::bearer::{self, Scheme};
use crate::auth::{access, password, refresh};
use crate::config::AuthConfig;
use crate::errors::{AppError, AuthError};
use crate::store::{Store, User, UserUpdate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: User,
    /// Access token.
    pub token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Store>,
    config: AuthConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        validate_credentials(email, password)?;
        let digest = hash_blocking(password).await?;

        match self.store.create_user(email, &digest).await? {
            Some(row) => {
                tracing::info!(user_id = %row.id, "user registered");
                Ok(row.into())
            }
            None => Err(AppError::Conflict("email already registered".into())),
        }
    }

    /// Verify email + password and open a new session.
    ///
    /// Unknown email and wrong password both yield `AuthFailed`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            let secret = password.to_string();
            let _ = tokio::task::spawn_blocking(move || password::verify_dummy(&secret)).await;
            tracing::info!(reason = "unknown_email", "login rejected");
            return Err(AuthError::AuthFailed.into());
        };

        if let Err(kind) = verify_blocking(password, &user.hashed_password).await? {
            tracing::info!(user_id = %user.id, reason = kind.kind(), "login rejected");
            return Err(AuthError::AuthFailed.into());
        }

        let token = access::mint(user.id, &self.config.signing_secret, self.config.access_ttl)?;
        let refresh_token = refresh::create(self.store.as_ref(), user.id, self.config.refresh_ttl).await?;

        tracing::info!(user_id = %user.id, "session opened");
        Ok(LoginResponse {
            user: user.into(),
            token,
            refresh_token,
        })
    }

    /// Exchange a refresh token (`Bearer <token>`) for a new access token.
    pub async fn refresh(&self, header: Option<&str>) -> Result<String, AppError> {
        let token = bearer::extract(header, Scheme::Bearer).map_err(|kind| {
            tracing::debug!(reason = kind.kind(), "refresh rejected");
            AuthError::AuthFailed
        })?;

        let Some(user_id) = refresh::lookup_active_identity(self.store.as_ref(), token, Utc::now()).await? else {
            tracing::info!(reason = "inactive_refresh_token", "refresh rejected");
            return Err(AuthError::AuthFailed.into());
        };

        let access_token = access::mint(user_id, &self.config.signing_secret, self.config.access_ttl)?;
        tracing::debug!(user_id = %user_id, "access token refreshed");
        Ok(access_token)
    }

    /// Revoke the session behind a refresh token. Already-revoked and unknown
    /// tokens fail.
    pub async fn revoke(&self, header: Option<&str>) -> Result<(), AppError> {
        let token = bearer::extract(header, Scheme::Bearer).map_err(|kind| {
            tracing::debug!(reason = kind.kind(), "revoke rejected");
            AuthError::AuthFailed
        })?;

        if !refresh::revoke(self.store.as_ref(), token).await? {
            tracing::info!(reason = "unknown_or_revoked", "revoke rejected");
            return Err(AuthError::AuthFailed.into());
        }

        tracing::info!("session revoked");
        Ok(())
    }

    /// Identity behind a `Bearer <access token>` header. Stateless: a token
    /// from a revoked session stays valid until it expires.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Uuid, AuthError> {
        let token = bearer::extract(header, Scheme::Bearer)?;
        self.verify_access(token)
    }

    /// Verify an already-extracted access token.
    pub fn verify_access(&self, token: &str) -> Result<Uuid, AuthError> {
        access::verify(token, &self.config.signing_secret).map_err(|kind| {
            tracing::debug!(reason = kind.kind(), "access token rejected");
            kind
        })
    }

    /// Replace the caller's own email and password.
    pub async fn update_credentials(
        &self,
        caller: Uuid,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        validate_credentials(email, password)?;

        if let Some(existing) = self.store.find_user_by_email(email).await? {
            if existing.id != caller {
                return Err(AppError::Conflict("email already registered".into()));
            }
        }

        let digest = hash_blocking(password).await?;
        match self.store.update_user(caller, email, &digest).await? {
            UserUpdate::Updated(row) => {
                tracing::info!(user_id = %caller, "credentials updated");
                Ok(row.into())
            }
            UserUpdate::Missing => Err(AppError::NotFound),
            // Claimed by someone else after the check above.
            UserUpdate::EmailTaken => Err(AppError::Conflict("email already registered".into())),
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::BadRequest("password must not be empty".into()));
    }
    Ok(())
}

async fn hash_blocking(secret: &str) -> anyhow::Result<String> {
    let secret = secret.to_string();
    tokio::task::spawn_blocking(move || password::hash_password(&secret)).await?
}

async fn verify_blocking(secret: &str, digest: &str) -> anyhow::Result<Result<(), AuthError>> {
    let (secret, digest) = (secret.to_string(), digest.to_string());
    Ok(tokio::task::spawn_blocking(move || password::verify_password(&secret, &digest)).await?)
}
