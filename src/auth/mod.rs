//! Authentication and session lifecycle.

pub mod access;
pub mod api_key;
pub mod bearer;
pub mod ownership;
pub mod password;
pub mod refresh;
pub mod session;

pub use bearer::Scheme;
pub use session::{LoginResponse, SessionManager};
