//! End-to-end session lifecycle against the in-memory store.
//!
//! Covers the register → login → mutate → refresh → revoke scenario and the
//! concurrent revoke/refresh guarantees.

use std::sync::Arc;

use murmur::auth::SessionManager;
use murmur::config::AuthConfig;
use murmur::errors::{AppError, AuthError};
use murmur::posts;
use murmur::store::{MemoryStore, Store};

fn setup() -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let sessions = SessionManager::new(store.clone(), AuthConfig::new("integration-secret"));
    (sessions, store)
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn is_auth_failed(err: &AppError) -> bool {
    matches!(err, AppError::Auth(AuthError::AuthFailed))
}

#[tokio::test]
async fn test_full_scenario() {
    let (sessions, store) = setup();

    let alice = sessions.register("a@x.com", "P@ss1").await.unwrap();
    let bob = sessions.register("b@x.com", "hunter2").await.unwrap();

    let login = sessions.login("a@x.com", "P@ss1").await.unwrap();
    assert_eq!(login.user.id, alice.id);
    assert!(!login.token.is_empty());
    assert!(!login.refresh_token.is_empty());

    // Bob's post cannot be deleted with Alice's access token
    let bobs_post = posts::create_post(store.as_ref(), bob.id, "bob was here").await.unwrap();
    let caller = sessions.authenticate(Some(&bearer(&login.token))).unwrap();
    let err = posts::delete_post(store.as_ref(), caller, bobs_post.id).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(AuthError::Forbidden)));
    assert!(store.get_post(bobs_post.id).await.unwrap().is_some());

    // Revoke, then refresh fails
    let refresh_header = bearer(&login.refresh_token);
    sessions.revoke(Some(&refresh_header)).await.unwrap();
    let err = sessions.refresh(Some(&refresh_header)).await.unwrap_err();
    assert!(is_auth_failed(&err));

    // Wrong password and unknown email fail identically
    let wrong_password = sessions.login("a@x.com", "wrong").await.unwrap_err();
    let unknown_email = sessions.login("nobody@x.com", "P@ss1").await.unwrap_err();
    assert!(is_auth_failed(&wrong_password));
    assert!(is_auth_failed(&unknown_email));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (sessions, _) = setup();
    sessions.register("a@x.com", "P@ss1").await.unwrap();

    let laptop = sessions.login("a@x.com", "P@ss1").await.unwrap();
    let phone = sessions.login("a@x.com", "P@ss1").await.unwrap();
    assert_ne!(laptop.refresh_token, phone.refresh_token);

    sessions.revoke(Some(&bearer(&laptop.refresh_token))).await.unwrap();
    assert!(sessions.refresh(Some(&bearer(&laptop.refresh_token))).await.is_err());
    assert!(sessions.refresh(Some(&bearer(&phone.refresh_token))).await.is_ok());
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let (sessions, _) = setup();
    sessions.register("a@x.com", "P@ss1").await.unwrap();
    let login = sessions.login("a@x.com", "P@ss1").await.unwrap();

    assert_eq!(
        sessions.authenticate(Some(&bearer(&login.refresh_token))),
        Err(AuthError::Malformed)
    );
}

#[tokio::test]
async fn test_access_token_from_other_secret_rejected() {
    let (sessions, store) = setup();
    sessions.register("a@x.com", "P@ss1").await.unwrap();

    let impostor = SessionManager::new(store.clone(), AuthConfig::new("some-other-secret"));
    let login = impostor.login("a@x.com", "P@ss1").await.unwrap();

    assert_eq!(
        sessions.authenticate(Some(&bearer(&login.token))),
        Err(AuthError::SignatureInvalid)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_revokes_exactly_one_wins() {
    let (sessions, _) = setup();
    sessions.register("a@x.com", "P@ss1").await.unwrap();
    let login = sessions.login("a@x.com", "P@ss1").await.unwrap();
    let header = bearer(&login.refresh_token);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let sessions = sessions.clone();
        let header = header.clone();
        handles.push(tokio::spawn(async move { sessions.revoke(Some(&header)).await }));
    }

    let mut wins = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(()) => wins += 1,
            Err(e) => assert!(is_auth_failed(&e)),
        }
    }
    assert_eq!(wins, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refresh_after_committed_revoke_always_fails() {
    let (sessions, _) = setup();
    sessions.register("a@x.com", "P@ss1").await.unwrap();
    let login = sessions.login("a@x.com", "P@ss1").await.unwrap();
    let header = bearer(&login.refresh_token);

    // Refreshes racing the revoke may go either way
    let mut racers = Vec::new();
    for _ in 0..8 {
        let sessions = sessions.clone();
        let header = header.clone();
        racers.push(tokio::spawn(async move { sessions.refresh(Some(&header)).await }));
    }
    sessions.revoke(Some(&header)).await.unwrap();
    for r in racers {
        let _ = r.await.unwrap();
    }

    // Every refresh that starts after the revoke committed must fail
    let mut late = Vec::new();
    for _ in 0..8 {
        let sessions = sessions.clone();
        let header = header.clone();
        late.push(tokio::spawn(async move { sessions.refresh(Some(&header)).await }));
    }
    for r in late {
        let err = r.await.unwrap().unwrap_err();
        assert!(is_auth_failed(&err));
    }
}
