//! Murmur — short-post backend.
//!
//! The interesting part is `auth`: stateless access tokens, store-backed
//! refresh sessions, header parsing and the ownership check on mutations.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod errors;
pub mod posts;
pub mod store;

use auth::SessionManager;
use store::Store;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionManager,
    pub config: config::Config,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: config::Config) -> anyhow::Result<Self> {
        let sessions = SessionManager::new(store.clone(), config.auth()?);
        Ok(Self {
            store,
            sessions,
            config,
        })
    }
}
