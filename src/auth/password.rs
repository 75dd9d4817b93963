//! Password hashing with Argon2id.
//!
//! Digests are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
//! parameters, so verification never needs anything besides the stored string.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;

use crate::errors::AuthError;

/// Hash a plaintext secret with a fresh random salt.
pub fn hash_password(secret: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Check `secret` against a stored digest.
///
/// An unparsable digest is treated as a mismatch. The comparison of the
/// recomputed output is constant-time inside `argon2`.
pub fn verify_password(secret: &str, digest: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(digest).map_err(|_| AuthError::Mismatch)?;
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .map_err(|_| AuthError::Mismatch)
}

static DUMMY_DIGEST: Lazy<Option<String>> =
    Lazy::new(|| hash_password("murmur-timing-equaliser").ok());

/// Burn the same CPU as a real verification. Used when no account matches
/// an email so both login failures take comparable time.
pub fn verify_dummy(secret: &str) {
    if let Some(digest) = DUMMY_DIGEST.as_deref() {
        let _ = verify_password(secret, digest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correctPassword123!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correctPassword123!", &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_is_mismatch() {
        let hash = hash_password("correctPassword123!").unwrap();
        assert_eq!(verify_password("wrongPassword", &hash), Err(AuthError::Mismatch));
        assert_eq!(verify_password("", &hash), Err(AuthError::Mismatch));
    }

    #[test]
    fn test_password_does_not_match_other_hash() {
        let h1 = hash_password("first-pass").unwrap();
        let h2 = hash_password("second-pass").unwrap();
        assert!(verify_password("first-pass", &h2).is_err());
        assert!(verify_password("second-pass", &h1).is_err());
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("P@ss1").unwrap();
        let b = hash_password("P@ss1").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("P@ss1", &a).is_ok());
        assert!(verify_password("P@ss1", &b).is_ok());
    }

    #[test]
    fn test_malformed_digest_fails_closed() {
        assert_eq!(verify_password("anything", "invalidhash"), Err(AuthError::Mismatch));
        assert_eq!(verify_password("anything", ""), Err(AuthError::Mismatch));
        assert_eq!(
            verify_password("anything", "$argon2id$v=19$m=19456,t=2,p=1$garbage"),
            Err(AuthError::Mismatch)
        );
    }

    #[test]
    fn test_verify_dummy_does_not_panic() {
        verify_dummy("whatever");
    }
}
