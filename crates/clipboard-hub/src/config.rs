//! Clipboard Hub configuration.
//!
//! Configuration is loaded from environment variables. Admin credentials may
//! also come from the command line. The admin password is redacted in Debug
//! output.

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Default HTTP and WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default admin username.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Default admin password.
pub const DEFAULT_ADMIN_PASSWORD: &str = "password";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Clipboard Hub configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// Basic-auth username for `/admin` paths.
    pub admin_username: String,

    /// Basic-auth password for `/admin` paths.
    pub admin_password: SecretString,

    /// Directory served as static assets at `/`, if any.
    pub static_dir: Option<PathBuf>,

    /// Per-request timeout for the HTTP surface.
    pub request_timeout_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"[REDACTED]")
            .field("static_dir", &self.static_dir)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid admin credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = match (vars.get("HUB_BIND_ADDRESS"), vars.get("PORT")) {
            (Some(address), _) => address.clone(),
            (None, Some(port)) => {
                let port: u16 = port.parse().map_err(|e| {
                    ConfigError::InvalidPort(format!(
                        "PORT must be a valid port number, got '{port}': {e}"
                    ))
                })?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_BIND_ADDRESS.to_string(),
        };

        let (admin_username, admin_password) =
            if let Some(pair) = vars.get("HUB_ADMIN_CREDENTIALS") {
                split_credentials(pair).ok_or_else(|| {
                    ConfigError::InvalidCredentials(
                        "HUB_ADMIN_CREDENTIALS must have the form username:password".to_string(),
                    )
                })?
            } else {
                let username = vars
                    .get("HUB_ADMIN_USERNAME")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string());
                let password = vars
                    .get("HUB_ADMIN_PASSWORD")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());
                (username, SecretString::from(password))
            };

        if admin_username.is_empty() {
            return Err(ConfigError::InvalidCredentials(
                "admin username must not be empty".to_string(),
            ));
        }

        let static_dir = vars
            .get("HUB_STATIC_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        // Parse request timeout with validation
        let request_timeout_seconds =
            if let Some(value_str) = vars.get("HUB_REQUEST_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidRequestTimeout(format!(
                        "HUB_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{value_str}': {e}"
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidRequestTimeout(
                        "HUB_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }

                value
            } else {
                DEFAULT_REQUEST_TIMEOUT_SECONDS
            };

        Ok(Config {
            bind_address,
            admin_username,
            admin_password,
            static_dir,
            request_timeout_seconds,
        })
    }

    /// Replace the admin credentials, e.g. with ones given on the command line.
    #[must_use]
    pub fn with_admin_credentials(mut self, username: String, password: SecretString) -> Self {
        self.admin_username = username;
        self.admin_password = password;
        self
    }
}

/// Parse admin credentials from command-line arguments (program name excluded).
///
/// Accepted forms, checked in order:
/// - `-a USER -p PASS` (flags in any order)
/// - `USER:PASS`
/// - `USER PASS`
///
/// Returns `None` when no form matches, leaving the configured account as is.
#[must_use]
pub fn parse_cli_credentials(args: &[String]) -> Option<(String, SecretString)> {
    let flag_value = |flag: &str| {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|index| args.get(index + 1))
            .filter(|value| !value.is_empty())
    };

    if let (Some(username), Some(password)) = (flag_value("-a"), flag_value("-p")) {
        return Some((username.clone(), SecretString::from(password.clone())));
    }

    let first = args.first()?;
    if first.contains(':') {
        return split_credentials(first);
    }

    match args.get(1) {
        Some(second) if !first.is_empty() && !second.is_empty() => {
            Some((first.clone(), SecretString::from(second.clone())))
        }
        _ => None,
    }
}

/// Split `user:pass` at the first colon. Passwords may contain colons.
fn split_credentials(pair: &str) -> Option<(String, SecretString)> {
    let (username, password) = pair.split_once(':')?;
    if username.is_empty() {
        return None;
    }
    Some((username.to_string(), SecretString::from(password.to_string())))
}
