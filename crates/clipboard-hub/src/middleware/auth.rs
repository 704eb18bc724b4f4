//! HTTP Basic authentication for privileged paths.
//!
//! Every request whose path starts with `/admin` must carry credentials
//! matching the configured admin account. Other paths pass through.

use crate::config::Config;
use crate::errors::HubError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;

/// Path prefix guarded by [`require_admin`].
pub const ADMIN_PATH_PREFIX: &str = "/admin";

/// State for the admin authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub username: String,
    pub password: SecretString,
}

impl AuthState {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            username: config.admin_username.clone(),
            password: config.admin_password.clone(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password.expose_secret()
    }
}

/// Basic-auth gate for `/admin` paths.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Basic base64(username:password)
/// ```
///
/// # Response
///
/// - 401 with `WWW-Authenticate: Basic realm="Admin Access"` if the header is
///   missing, malformed or carries the wrong credentials
/// - Otherwise continues to the next handler
#[instrument(skip(state, req, next), name = "hub.middleware.auth")]
pub async fn require_admin(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, HubError> {
    if !req.uri().path().starts_with(ADMIN_PATH_PREFIX) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "hub.middleware.auth", "Missing Authorization header");
            HubError::Unauthorized("Authentication required".to_string())
        })?;

    let (username, password) = decode_basic(auth_header).ok_or_else(|| {
        tracing::debug!(target: "hub.middleware.auth", "Malformed Basic credentials");
        HubError::Unauthorized("Authentication required".to_string())
    })?;

    if !state.matches(&username, &password) {
        tracing::warn!(
            target: "hub.middleware.auth",
            path = %req.uri().path(),
            "Rejected admin credentials"
        );
        return Err(HubError::Unauthorized("Invalid credentials".to_string()));
    }

    Ok(next.run(req).await)
}

/// Decode `Basic base64(user:pass)` into its parts.
fn decode_basic(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
