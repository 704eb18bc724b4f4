//! HTTP routes for Clipboard Hub.
//!
//! Defines the Axum router and application state.

use crate::actors::HubHandle;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{require_admin, AuthState};
use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the hub actor that owns all shared state.
    pub hub: HubHandle,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/api/clipboards` - clipboard collection (public)
/// - `/admin/devices`, `/admin/blacklist` - privileged, Basic auth
/// - `/ws` - device channel upgrade
/// - optional static assets from `HUB_STATIC_DIR`
/// - TraceLayer for request logging
/// - Configurable request timeout
///
/// Health and metrics endpoints are merged in by the caller.
pub fn build_routes(state: Arc<AppState>) -> Router {
    let auth_state = Arc::new(AuthState::from_config(&state.config));
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);
    let static_dir = state.config.static_dir.clone();

    let api_routes = Router::new()
        .route(
            "/api/clipboards",
            get(handlers::list_clipboards).post(handlers::upsert_clipboard),
        )
        .route("/api/clipboards/:id", delete(handlers::delete_clipboard))
        .route("/ws", get(handlers::ws_upgrade));

    let admin_routes = Router::new()
        .route("/admin/devices", get(handlers::list_devices))
        .route(
            "/admin/blacklist",
            get(handlers::list_blacklist).post(handlers::add_to_blacklist),
        )
        .route(
            "/admin/blacklist/:ip",
            delete(handlers::remove_from_blacklist),
        );

    let mut app = api_routes.merge(admin_routes).with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    // Apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. require_admin - Basic auth for every /admin path, static pages included
    // 2. TraceLayer - Log request details
    // 3. TimeoutLayer - Timeout the request (outermost)
    app.layer(axum::middleware::from_fn_with_state(
        auth_state,
        require_admin,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(TimeoutLayer::new(timeout))
}
