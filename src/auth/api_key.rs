use subtle::ConstantTimeEq;

use crate::errors::AuthError;

/// Compare a presented preshared key against the configured one without
/// short-circuiting on the first differing byte.
pub fn verify_api_key(presented: &str, expected: &str) -> Result<(), AuthError> {
    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::AuthFailed)
    }
}

/// Log-safe rendering of a presented key.
pub fn mask(key: &str) -> String {
    if key.len() > 8 && key.is_ascii() {
        format!("{}…{}", &key[..4], &key[key.len() - 4..])
    } else {
        "****".to_string()
    }
}
