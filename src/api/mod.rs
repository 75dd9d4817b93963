use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Platform;
use crate::errors::{AppError, AuthError};
use crate::AppState;

pub mod handlers;

/// Full HTTP surface: `/api/*` plus the dev-only `/admin/*`.
pub fn router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .nest("/api", api_router())
        .nest("/admin", admin_router(state.clone()))
        .fallback(fallback_404)
        .with_state(state)
        // Dropping a timed-out request drops its in-flight store calls.
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/users",
            post(handlers::create_user).put(handlers::update_user),
        )
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/revoke", post(handlers::revoke))
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/:id",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route("/webhooks/billing", post(handlers::billing_webhook))
}

fn admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/reset", post(handlers::reset))
        .layer(middleware::from_fn_with_state(state, dev_only))
}

async fn fallback_404() -> AppError {
    AppError::NotFound
}

/// Middleware: destructive admin routes only exist on the dev platform.
async fn dev_only(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.config.platform != Platform::Dev {
        tracing::warn!(path = %req.uri().path(), "admin endpoint called outside dev platform");
        return Err(AuthError::Forbidden.into());
    }
    Ok(next.run(req).await)
}
