use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewRefreshToken, PostRow, RefreshTokenRow, Store, UserRow, UserUpdate};

/// In-process `Store`. Refresh tokens and posts live in `DashMap`s so every
/// read-modify-write on a single key happens under that key's shard lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, UserRow>>>,
    refresh_tokens: Arc<DashMap<String, RefreshTokenRow>>,
    posts: Arc<DashMap<Uuid, PostRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored refresh token record, for inspection in tests.
    pub fn refresh_token(&self, token: &str) -> Option<RefreshTokenRow> {
        self.refresh_tokens.get(token).map(|r| r.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> anyhow::Result<Option<UserRow>> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Ok(None);
        }
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_premium: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> anyhow::Result<UserUpdate> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email && u.id != id) {
            return Ok(UserUpdate::EmailTaken);
        }
        Ok(match users.get_mut(&id) {
            Some(u) => {
                u.email = email.to_string();
                u.hashed_password = hashed_password.to_string();
                u.updated_at = Utc::now();
                UserUpdate::Updated(u.clone())
            }
            None => UserUpdate::Missing,
        })
    }

    async fn upgrade_user(&self, id: Uuid) -> anyhow::Result<Option<UserRow>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|u| {
            u.is_premium = true;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn create_refresh_token(&self, token: &NewRefreshToken) -> anyhow::Result<bool> {
        if !self.users.read().await.contains_key(&token.user_id) {
            anyhow::bail!("refresh token references unknown user {}", token.user_id);
        }
        match self.refresh_tokens.entry(token.token.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(RefreshTokenRow {
                    token: token.token.clone(),
                    user_id: token.user_id,
                    created_at: Utc::now(),
                    expires_at: token.expires_at,
                    revoked_at: None,
                });
                Ok(true)
            }
        }
    }

    async fn find_active_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Uuid>> {
        let user_id = match self.refresh_tokens.get(token) {
            Some(row) if row.is_active(now) => row.user_id,
            _ => return Ok(None),
        };
        let exists = self.users.read().await.contains_key(&user_id);
        Ok(exists.then_some(user_id))
    }

    async fn revoke_refresh_token(&self, token: &str) -> anyhow::Result<bool> {
        match self.refresh_tokens.get_mut(token) {
            Some(mut row) if row.revoked_at.is_none() => {
                row.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_post(&self, user_id: Uuid, body: &str) -> anyhow::Result<PostRow> {
        if !self.users.read().await.contains_key(&user_id) {
            anyhow::bail!("post references unknown user {}", user_id);
        }
        let now = Utc::now();
        let row = PostRow {
            id: Uuid::new_v4(),
            body: body.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.posts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostRow>> {
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn list_posts(&self) -> anyhow::Result<Vec<PostRow>> {
        let mut rows: Vec<PostRow> = self.posts.iter().map(|p| p.value().clone()).collect();
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }

    async fn delete_post(&self, id: Uuid, owner: Uuid) -> anyhow::Result<bool> {
        Ok(self.posts.remove_if(&id, |_, p| p.user_id == owner).is_some())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        users.clear();
        self.refresh_tokens.clear();
        self.posts.clear();
        Ok(())
    }
}
