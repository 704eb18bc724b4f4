//! WebSocket upgrade for device channels.

use crate::actors::serve_channel;
use crate::routes::AppState;
use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::HeaderMap,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Address recorded when neither a proxy header nor the peer is known.
pub const UNKNOWN_IP: &str = "unknown";

/// Handler for GET /ws
///
/// Every upgrade gets a fresh session id. Admission happens on the
/// channel task, after the upgrade completes.
pub async fn ws_upgrade(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let ip = resolve_client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let session_id = Uuid::new_v4().to_string();

    debug!(
        target: "hub.handlers.ws",
        session_id = %session_id,
        ip = %ip,
        "Upgrading device channel"
    );

    let hub = state.hub.clone();
    upgrade.on_upgrade(move |socket| serve_channel(socket, hub, session_id, ip))
}

/// Resolve the address used for presence and denylist checks.
///
/// The first entry of `X-Forwarded-For` wins, then the peer address.
#[must_use]
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => UNKNOWN_IP.to_string(),
    }
}
