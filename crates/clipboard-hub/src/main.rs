//! Clipboard Hub
//!
//! Entry point for the shared clipboard server. Serves the HTTP API, the
//! device WebSocket and (optionally) static assets on one listener.

use clipboard_hub::actors::HubActor;
use clipboard_hub::config::{parse_cli_credentials, Config};
use clipboard_hub::observability::{health_router, metrics::init_metrics_recorder};
use clipboard_hub::routes::{self, AppState};

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipboard_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clipboard Hub");

    // Load configuration
    let mut config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some((username, password)) = parse_cli_credentials(&args) {
        config = config.with_admin_credentials(username, password);
    }

    info!(
        bind_address = %config.bind_address,
        admin_username = %config.admin_username,
        static_dir = ?config.static_dir,
        request_timeout_seconds = config.request_timeout_seconds,
        "Configuration loaded successfully"
    );

    // Install the metrics recorder before anything records
    let prometheus = init_metrics_recorder().map_err(|e| {
        error!("{}", e);
        e
    })?;

    // Start the hub actor
    let cancel_token = CancellationToken::new();
    let (hub, hub_task) = HubActor::spawn(cancel_token.clone());

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState {
        hub: hub.clone(),
        config,
    });

    let app = routes::build_routes(state)
        .merge(health_router(hub))
        .merge(Router::new().route(
            "/metrics",
            get(move || std::future::ready(prometheus.render())),
        ));

    // Parse bind address
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Clipboard Hub listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel_token))
    .await?;

    if let Err(e) = hub_task.await {
        warn!("Hub task ended abnormally: {}", e);
    }

    info!("Clipboard Hub shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
///
/// On a signal, cancels the hub. That closes every device channel and
/// turns `/ready` to 503.
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    cancel_token.cancel();
}
