use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::bearer::{self, Scheme};
use crate::auth::LoginResponse;
use crate::billing::{self, WebhookEvent};
use crate::errors::{AppError, AuthError};
use crate::posts;
use crate::store::{PostRow, User};
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}

// ── Helpers ──────────────────────────────────────────────────

/// Raw `Authorization` value. Non-ASCII headers are rejected as malformed.
fn authorization(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    match headers.get(AUTHORIZATION) {
        None => Ok(None),
        Some(v) => v
            .to_str()
            .map(Some)
            .map_err(|_| AppError::Auth(AuthError::Malformed)),
    }
}

/// Verified identity behind a `Bearer <access token>` header.
fn caller(state: &AppState, headers: &HeaderMap) -> Result<Uuid, AppError> {
    let token = bearer::from_headers(headers, Scheme::Bearer)?;
    Ok(state.sessions.verify_access(token)?)
}

/// Parse a JSON body only after the caller has been authenticated, so an
/// anonymous request never learns anything from body validation.
fn json_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid request body: {}", e)))
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /api/healthz
pub async fn healthz() -> &'static str {
    "OK"
}

/// POST /api/users — register
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.sessions.register(&payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users — replace the caller's own email and password
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<User>, AppError> {
    let user_id = caller(&state, &headers)?;
    let payload: CredentialsRequest = json_body(&body)?;
    let user = state
        .sessions
        .update_credentials(user_id, &payload.email, &payload.password)
        .await?;
    Ok(Json(user))
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = state.sessions.login(&payload.email, &payload.password).await?;
    Ok(Json(session))
}

/// POST /api/refresh — `Authorization: Bearer <refresh token>`
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AppError> {
    let header = authorization(&headers).map_err(|_| AuthError::AuthFailed)?;
    let token = state.sessions.refresh(header).await?;
    Ok(Json(RefreshResponse { token }))
}

/// POST /api/revoke — `Authorization: Bearer <refresh token>`
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let header = authorization(&headers).map_err(|_| AuthError::AuthFailed)?;
    state.sessions.revoke(header).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<PostRow>), AppError> {
    let user_id = caller(&state, &headers)?;
    let payload: CreatePostRequest = json_body(&body)?;
    let post = posts::create_post(state.store.as_ref(), user_id, &payload.body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PostRow>>, AppError> {
    Ok(Json(state.store.list_posts().await?))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostRow>, AppError> {
    let post = state.store.get_post(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(post))
}

/// DELETE /api/posts/:id — author only
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user_id = caller(&state, &headers)?;
    posts::delete_post(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/webhooks/billing — `Authorization: ApiKey <key>`
///
/// The key is checked before the body is parsed.
pub async fn billing_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let header = authorization(&headers).map_err(|_| AuthError::AuthFailed)?;
    billing::authenticate(header, &state.config.webhook_key)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid webhook payload: {}", e)))?;
    billing::handle_event(state.store.as_ref(), &event).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/reset — dev platform only (see `dev_only`)
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
    state.store.reset().await?;
    tracing::warn!("all users, sessions and posts deleted");
    Ok(StatusCode::OK)
}
