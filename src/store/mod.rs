//! Persistence collaborator.
//!
//! The session core only talks to `Store`; `PgStore` backs production and
//! `MemoryStore` backs tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            is_premium: row.is_premium,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub body: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRow {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRow {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of replacing a user's credentials.
#[derive(Debug, Clone)]
pub enum UserUpdate {
    Updated(UserRow),
    /// No user with that id.
    Missing,
    /// The new email belongs to another user.
    EmailTaken,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- Users --

    /// Returns `None` when the email is already registered.
    async fn create_user(&self, email: &str, hashed_password: &str) -> anyhow::Result<Option<UserRow>>;

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>>;

    /// Replace email and password hash. Never steals another user's email.
    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> anyhow::Result<UserUpdate>;

    async fn upgrade_user(&self, id: Uuid) -> anyhow::Result<Option<UserRow>>;

    // -- Refresh tokens --

    /// Returns `false` if the token key already exists. Never overwrites.
    async fn create_refresh_token(&self, token: &NewRefreshToken) -> anyhow::Result<bool>;

    /// Owner of `token` if it exists, is unrevoked, unexpired at `now`, and
    /// its user still exists.
    async fn find_active_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Uuid>>;

    /// Mark the token revoked. `false` if it does not exist or was already revoked.
    async fn revoke_refresh_token(&self, token: &str) -> anyhow::Result<bool>;

    // -- Posts --

    async fn create_post(&self, user_id: Uuid, body: &str) -> anyhow::Result<PostRow>;

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostRow>>;

    async fn list_posts(&self) -> anyhow::Result<Vec<PostRow>>;

    /// Delete only if `owner` still matches. `false` if nothing was removed.
    async fn delete_post(&self, id: Uuid, owner: Uuid) -> anyhow::Result<bool>;

    // -- Admin --

    /// Drop every user and everything hanging off them.
    async fn reset(&self) -> anyhow::Result<()>;
}
