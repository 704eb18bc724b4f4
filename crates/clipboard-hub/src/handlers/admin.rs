//! Privileged handlers under `/admin`.
//!
//! Credentials are checked by [`crate::middleware::require_admin`] before
//! any of these run.

use crate::errors::HubError;
use crate::models::{BanRequest, DenialView, EndpointSession, SuccessResponse};
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

const MISSING_BAN_FIELDS: &str = "Missing required fields: ip and hours";

/// Handler for GET /admin/devices
#[instrument(skip_all, name = "hub.handlers.admin")]
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EndpointSession>>, HubError> {
    Ok(Json(state.hub.list_sessions().await?))
}

/// Handler for GET /admin/blacklist
///
/// Expired entries still show up, with `remainingHours: 0`, until the
/// address next tries to connect.
#[instrument(skip_all, name = "hub.handlers.admin")]
pub async fn list_blacklist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DenialView>>, HubError> {
    Ok(Json(state.hub.list_denials().await?))
}

/// Handler for POST /admin/blacklist
///
/// # Request Body
///
/// ```json
/// { "ip": "1.2.3.4", "hours": 5 }
/// ```
///
/// # Response
///
/// - 200 OK: `{"success": true}`; every device from `ip` was sent `kicked`
///   and closed
/// - 400 Bad Request: missing fields, or `hours` outside 1..=720
#[instrument(skip_all, name = "hub.handlers.admin")]
pub async fn add_to_blacklist(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BanRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, HubError> {
    let Json(request) =
        payload.map_err(|_| HubError::Validation(MISSING_BAN_FIELDS.to_string()))?;

    let (Some(ip), Some(hours)) = (request.ip.filter(|ip| !ip.is_empty()), request.hours) else {
        return Err(HubError::Validation(MISSING_BAN_FIELDS.to_string()));
    };

    let closed = state.hub.ban(ip.clone(), hours).await?;

    info!(
        target: "hub.handlers.admin",
        ip = %ip,
        hours = hours,
        closed = closed,
        "Admin banned address"
    );

    Ok(Json(SuccessResponse::ok()))
}

/// Handler for DELETE /admin/blacklist/:ip
///
/// # Response
///
/// - 200 OK: `{"success": true}`
/// - 404 Not Found: the address is not in the blacklist
#[instrument(skip(state), name = "hub.handlers.admin")]
pub async fn remove_from_blacklist(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<Json<SuccessResponse>, HubError> {
    state.hub.unban(ip).await?;
    Ok(Json(SuccessResponse::ok()))
}
