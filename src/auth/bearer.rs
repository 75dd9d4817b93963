use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::errors::AuthError;

/// Authorization schemes accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Access and refresh tokens.
    Bearer,
    /// The billing provider's preshared key.
    ApiKey,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Bearer => "Bearer",
            Scheme::ApiKey => "ApiKey",
        }
    }
}

/// Parse `"<scheme> <token>"` out of a raw `Authorization` value.
///
/// The scheme match is case-sensitive, the separator is exactly one ASCII
/// space and the token must be non-empty with no further whitespace.
pub fn extract(header: Option<&str>, expected: Scheme) -> Result<&str, AuthError> {
    let value = match header {
        None => return Err(AuthError::Missing),
        Some(v) if v.is_empty() => return Err(AuthError::Missing),
        Some(v) => v,
    };

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::Malformed)?;
    if scheme != expected.as_str() {
        return Err(AuthError::Malformed);
    }
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

/// `extract` over an axum header map. A header that is not visible ASCII is
/// malformed rather than missing.
pub fn from_headers(headers: &HeaderMap, expected: Scheme) -> Result<&str, AuthError> {
    match headers.get(AUTHORIZATION) {
        None => Err(AuthError::Missing),
        Some(v) => {
            let s = v.to_str().map_err(|_| AuthError::Malformed)?;
            extract(Some(s), expected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_valid_bearer() {
        assert_eq!(extract(Some("Bearer abc"), Scheme::Bearer), Ok("abc"));
        assert_eq!(extract(Some("ApiKey f271c8"), Scheme::ApiKey), Ok("f271c8"));
    }

    #[test]
    fn test_missing() {
        assert_eq!(extract(None, Scheme::Bearer), Err(AuthError::Missing));
        assert_eq!(extract(Some(""), Scheme::Bearer), Err(AuthError::Missing));
    }

    #[test]
    fn test_malformed_shapes() {
        for raw in [
            "Bearer",
            "Bearer ",
            "Bearerabc",
            "Basic abc",
            "bearer abc",
            "BEARER abc",
            "Bearer  abc",
            "Bearer abc def",
            " Bearer abc",
            "Bearer\tabc",
        ] {
            assert_eq!(
                extract(Some(raw), Scheme::Bearer),
                Err(AuthError::Malformed),
                "input {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_schemes_do_not_cross() {
        assert_eq!(extract(Some("ApiKey abc"), Scheme::Bearer), Err(AuthError::Malformed));
        assert_eq!(extract(Some("Bearer abc"), Scheme::ApiKey), Err(AuthError::Malformed));
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(from_headers(&headers, Scheme::Bearer), Err(AuthError::Missing));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(from_headers(&headers, Scheme::Bearer), Ok("tok"));

        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff").unwrap());
        assert_eq!(from_headers(&headers, Scheme::Bearer), Err(AuthError::Malformed));
    }
}
