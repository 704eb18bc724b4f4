//! Health endpoints for Clipboard Hub.
//!
//! - `GET /health` - Liveness: the process is serving HTTP.
//! - `GET /ready` - Readiness: the hub actor answers a status request.
//!
//! Readiness is derived from the hub itself rather than a flag, so a hub
//! that was cancelled or whose task exited reports 503.

use crate::actors::{HubHandle, HubStatus};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::time::Duration;
use tracing::warn;

/// How long `/ready` waits for the hub to answer.
pub const READINESS_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Create the router serving `/health` and `/ready` against `hub`.
pub fn health_router(hub: HubHandle) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(hub)
}

async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

async fn readiness_handler(
    State(hub): State<HubHandle>,
) -> Result<Json<HubStatus>, StatusCode> {
    if hub.is_cancelled() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    match tokio::time::timeout(READINESS_PROBE_TIMEOUT, hub.status()).await {
        Ok(Ok(status)) => Ok(Json(status)),
        Ok(Err(e)) => {
            warn!(target: "hub.observability.health", error = %e, "Hub not answering");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(_) => {
            warn!(target: "hub.observability.health", "Hub status request timed out");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
