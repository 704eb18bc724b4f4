//! Middleware for Clipboard Hub.

pub mod auth;

pub use auth::{require_admin, AuthState};
