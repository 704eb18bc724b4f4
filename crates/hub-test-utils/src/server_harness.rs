//! Test server harness for E2E testing
//!
//! Provides `TestHubServer` for spawning real hub server instances in tests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clipboard_hub::actors::{HubActor, HubHandle};
use clipboard_hub::config::Config;
use clipboard_hub::observability::health_router;
use clipboard_hub::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Admin username configured for every test server.
pub const TEST_ADMIN_USERNAME: &str = "test-admin";

/// Admin password configured for every test server.
pub const TEST_ADMIN_PASSWORD: &str = "test-password";

/// Test harness for spawning a Clipboard Hub server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_admin_devices() -> Result<(), anyhow::Error> {
///     let server = TestHubServer::spawn().await?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/admin/devices", server.url()))
///         .header("authorization", server.admin_auth_header())
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestHubServer {
    addr: SocketAddr,
    config: Config,
    hub: HubHandle,
    cancel_token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestHubServer {
    /// Spawn a new test server instance with a fresh hub.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn with extra configuration variables layered over the test defaults.
    pub async fn spawn_with_vars(
        extra: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        // Build configuration for test environment
        let mut vars = HashMap::from([
            ("HUB_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "HUB_ADMIN_USERNAME".to_string(),
                TEST_ADMIN_USERNAME.to_string(),
            ),
            (
                "HUB_ADMIN_PASSWORD".to_string(),
                TEST_ADMIN_PASSWORD.to_string(),
            ),
        ]);
        vars.extend(extra);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let cancel_token = CancellationToken::new();
        let (hub, _hub_task) = HubActor::spawn(cancel_token.clone());

        let state = Arc::new(AppState {
            hub: hub.clone(),
            config: config.clone(),
        });

        // Build routes using the hub's real route builder
        let app = routes::build_routes(state).merge(health_router(hub.clone()));

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            // Use into_make_service_with_connect_info to support SocketAddr extraction
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            hub,
            cancel_token,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the server's hub, for attaching in-process channels.
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// `Authorization` header value for the test admin account.
    pub fn admin_auth_header(&self) -> String {
        basic_auth_header(TEST_ADMIN_USERNAME, TEST_ADMIN_PASSWORD)
    }
}

/// Build a `Basic` authorization header value.
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

impl Drop for TestHubServer {
    fn drop(&mut self) {
        // Stop the hub and abort the HTTP server task so each test cleans up
        // immediately.
        self.cancel_token.cancel();
        self._handle.abort();
    }
}
