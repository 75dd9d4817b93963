use uuid::Uuid;

use crate::errors::AuthError;

/// Allow a mutation only when the verified caller owns the resource.
pub fn authorize(caller: Uuid, owner: Uuid) -> Result<(), AuthError> {
    if caller == owner {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_allowed() {
        let id = Uuid::new_v4();
        assert!(authorize(id, id).is_ok());
    }

    #[test]
    fn test_non_owner_forbidden() {
        assert_eq!(
            authorize(Uuid::new_v4(), Uuid::new_v4()),
            Err(AuthError::Forbidden)
        );
    }
}
