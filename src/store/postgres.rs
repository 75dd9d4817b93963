use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewRefreshToken, PostRow, Store, UserRow, UserUpdate};

const USER_COLUMNS: &str = "id, email, hashed_password, is_premium, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    // -- User Operations --

    async fn create_user(&self, email: &str, hashed_password: &str) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"INSERT INTO users (email, hashed_password)
               VALUES ($1, $2)
               ON CONFLICT (email) DO NOTHING
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(email)
        .bind(hashed_password)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> anyhow::Result<UserUpdate> {
        let result = sqlx::query_as::<_, UserRow>(&format!(
            r#"UPDATE users
               SET email = $2, hashed_password = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(email)
        .bind(hashed_password)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(UserUpdate::Updated(row)),
            Ok(None) => Ok(UserUpdate::Missing),
            Err(e)
                if matches!(
                    e.as_database_error().map(DatabaseError::kind),
                    Some(ErrorKind::UniqueViolation)
                ) =>
            {
                Ok(UserUpdate::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upgrade_user(&self, id: Uuid) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"UPDATE users
               SET is_premium = TRUE, updated_at = NOW()
               WHERE id = $1
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    // -- Refresh Token Operations --

    async fn create_refresh_token(&self, token: &NewRefreshToken) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"INSERT INTO refresh_tokens (token, user_id, expires_at)
               VALUES ($1, $2, $3)
               ON CONFLICT (token) DO NOTHING"#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_active_refresh_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT u.id
               FROM refresh_tokens rt
               JOIN users u ON u.id = rt.user_id
               WHERE rt.token = $1
                 AND rt.revoked_at IS NULL
                 AND rt.expires_at > $2"#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn revoke_refresh_token(&self, token: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"UPDATE refresh_tokens
               SET revoked_at = NOW(), updated_at = NOW()
               WHERE token = $1 AND revoked_at IS NULL"#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // -- Post Operations --

    async fn create_post(&self, user_id: Uuid, body: &str) -> anyhow::Result<PostRow> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"INSERT INTO posts (body, user_id)
               VALUES ($1, $2)
               RETURNING id, body, user_id, created_at, updated_at"#,
        )
        .bind(body)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostRow>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, body, user_id, created_at, updated_at FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_posts(&self) -> anyhow::Result<Vec<PostRow>> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT id, body, user_id, created_at, updated_at FROM posts ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete_post(&self, id: Uuid, owner: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // -- Admin --

    async fn reset(&self) -> anyhow::Result<()> {
        // refresh_tokens and posts cascade
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }
}
