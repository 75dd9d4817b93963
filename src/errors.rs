use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Credential failures. Each kind stays distinct for logging; the HTTP layer
/// renders every kind except `Forbidden` as the same opaque 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credential presented")]
    Missing,

    #[error("credential is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token issuer mismatch")]
    WrongIssuer,

    #[error("token subject is not a valid identity")]
    MalformedSubject,

    #[error("password mismatch")]
    Mismatch,

    #[error("caller does not own the resource")]
    Forbidden,

    #[error("authentication failed")]
    AuthFailed,
}

impl AuthError {
    /// Short stable tag for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Malformed => "malformed",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::Expired => "expired",
            AuthError::WrongIssuer => "wrong_issuer",
            AuthError::MalformedSubject => "malformed_subject",
            AuthError::Mismatch => "mismatch",
            AuthError::Forbidden => "forbidden",
            AuthError::AuthFailed => "auth_failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("resource not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Auth(AuthError::Forbidden) => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "forbidden",
                "you are not allowed to modify this resource".to_string(),
            ),
            AppError::Auth(kind) => {
                tracing::debug!(reason = kind.kind(), "rejecting request as unauthenticated");
                (
                    StatusCode::UNAUTHORIZED,
                    "authentication_error",
                    "auth_failed",
                    "authentication failed".to_string(),
                )
            }
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "invalid_request_error",
                "not_found",
                "resource not found".to_string(),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "invalid_request_error",
                "conflict",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                msg.clone(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_auth_kind_except_forbidden_is_401() {
        for kind in [
            AuthError::Missing,
            AuthError::Malformed,
            AuthError::SignatureInvalid,
            AuthError::Expired,
            AuthError::WrongIssuer,
            AuthError::MalformedSubject,
            AuthError::Mismatch,
            AuthError::AuthFailed,
        ] {
            let resp = AppError::from(kind).into_response();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "kind {}", kind.kind());
            assert!(resp.headers().contains_key("www-authenticate"));
        }
    }

    #[test]
    fn test_forbidden_is_403() {
        let resp = AppError::from(AuthError::Forbidden).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_does_not_leak_message() {
        let resp = AppError::Internal(anyhow::anyhow!("pool exhausted at 10.0.0.4")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
