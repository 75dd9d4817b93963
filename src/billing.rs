//! Billing provider webhook.

use serde::Deserialize;
use uuid::Uuid;

use crate::auth::api_key;
use crate::auth::bearer::{self, Scheme};
use crate::errors::{AppError, AuthError};
use crate::store::Store;

pub const USER_UPGRADED: &str = "user.upgraded";

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Upgraded,
    Ignored,
}

/// Check the provider's `ApiKey` header. Any failure is `AuthFailed`.
pub fn authenticate(header: Option<&str>, expected_key: &str) -> Result<(), AuthError> {
    let presented = bearer::extract(header, Scheme::ApiKey).map_err(|kind| {
        tracing::warn!(reason = kind.kind(), "billing webhook: unusable authorization header");
        AuthError::AuthFailed
    })?;
    api_key::verify_api_key(presented, expected_key).map_err(|e| {
        tracing::warn!(provided = %api_key::mask(presented), "billing webhook: invalid key");
        e
    })
}

pub async fn handle_event(store: &dyn Store, event: &WebhookEvent) -> Result<Outcome, AppError> {
    if event.event != USER_UPGRADED {
        tracing::debug!(event = %event.event, "billing webhook: ignoring event");
        return Ok(Outcome::Ignored);
    }

    match store.upgrade_user(event.data.user_id).await? {
        Some(_) => {
            tracing::info!(user_id = %event.data.user_id, "user upgraded to premium");
            Ok(Outcome::Upgraded)
        }
        None => Err(AppError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn event(kind: &str, user_id: Uuid) -> WebhookEvent {
        WebhookEvent {
            event: kind.to_string(),
            data: WebhookData { user_id },
        }
    }

    #[test]
    fn test_authenticate() {
        assert!(authenticate(Some("ApiKey k3y-0123456789"), "k3y-0123456789").is_ok());
        assert_eq!(
            authenticate(Some("ApiKey wrong"), "k3y-0123456789"),
            Err(AuthError::AuthFailed)
        );
        assert_eq!(
            authenticate(Some("Bearer k3y-0123456789"), "k3y-0123456789"),
            Err(AuthError::AuthFailed)
        );
        assert_eq!(authenticate(None, "k3y-0123456789"), Err(AuthError::AuthFailed));
    }

    #[tokio::test]
    async fn test_upgrade_and_ignore() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "h").await.unwrap().unwrap();

        assert_eq!(
            handle_event(&store, &event("user.downgraded", user.id)).await.unwrap(),
            Outcome::Ignored
        );
        assert!(!store.find_user_by_email("a@x.com").await.unwrap().unwrap().is_premium);

        assert_eq!(
            handle_event(&store, &event(USER_UPGRADED, user.id)).await.unwrap(),
            Outcome::Upgraded
        );
        assert!(store.find_user_by_email("a@x.com").await.unwrap().unwrap().is_premium);

        assert!(matches!(
            handle_event(&store, &event(USER_UPGRADED, Uuid::new_v4())).await,
            Err(AppError::NotFound)
        ));
    }
}
