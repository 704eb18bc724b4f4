//! Clipboard Hub error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and to
//! failure acknowledgements on the device channel. Messages returned to
//! clients never carry internal details; those are logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Challenge sent with every 401 on privileged paths.
pub const ADMIN_AUTH_CHALLENGE: &str = "Basic realm=\"Admin Access\"";

/// Clipboard Hub error type.
///
/// Maps to HTTP status codes:
/// - Validation: 400 Bad Request
/// - Forbidden: 400 Bad Request (protected clipboard)
/// - NotFound: 404 Not Found
/// - Unauthorized: 401 Unauthorized
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    /// Malformed request, missing fields or out-of-range ban duration.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown denylist address or kick target not connected.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to remove the protected default clipboard.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or invalid admin credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Hub actor unavailable (mailbox closed or reply dropped).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubError::Validation(_) | HubError::Forbidden(_) => StatusCode::BAD_REQUEST,
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a client-safe error message.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            HubError::Validation(msg)
            | HubError::NotFound(msg)
            | HubError::Forbidden(msg)
            | HubError::Unauthorized(msg) => msg.clone(),
            HubError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let HubError::Internal(detail) = &self {
            tracing::error!(target: "hub.errors", error = %detail, "Hub operation failed");
        }

        let body = ErrorResponse {
            error: self.client_message(),
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(ADMIN_AUTH_CHALLENGE),
            );
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            HubError::Validation("bad hours".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HubError::Forbidden("default".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HubError::NotFound("ip".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HubError::Unauthorized("no header".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HubError::Internal("mailbox closed".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", HubError::NotFound("device".to_string())),
            "Not found: device"
        );
        assert_eq!(
            format!("{}", HubError::Validation("hours".to_string())),
            "Validation error: hours"
        );
    }

    #[test]
    fn test_client_message_hides_internal_details() {
        let err = HubError::Internal("hub mailbox closed: SendError".to_string());
        assert_eq!(err.client_message(), "An internal error occurred");
        assert!(!err.client_message().contains("mailbox"));
    }

    #[tokio::test]
    async fn test_into_response_body_shape() {
        let response = HubError::Forbidden("Cannot delete the default clipboard".to_string())
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "Cannot delete the default clipboard");
    }

    #[tokio::test]
    async fn test_unauthorized_sets_challenge_header() {
        let response = HubError::Unauthorized("Authentication required".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok());
        assert_eq!(challenge, Some(ADMIN_AUTH_CHALLENGE));
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response =
            HubError::NotFound("The specified IP is not in the blacklist".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "The specified IP is not in the blacklist");
    }
}
