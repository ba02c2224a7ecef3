//! Test server harness for E2E testing
//!
//! Provides `TestButlerServer` for spawning real Butler server instances in
//! tests. The key set is preloaded with the fixture keys and the identity
//! provider is a mock unless the test supplies its own.

use crate::crypto_fixtures::{jwks, TEST_KEY_1, TEST_KEY_2};
use crate::token_builders::TEST_USER_POOL_ID;
use butler_service::auth::{KeySet, KeySetCache};
use butler_service::config::Config;
use butler_service::observability::metrics::init_metrics_recorder;
use butler_service::routes::{self, AppState};
use butler_service::services::identity_provider::mock::MockIdentityProvider;
use butler_service::services::IdentityProvider;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Configuration used by every test server.
pub fn test_config() -> Result<Config, anyhow::Error> {
    let vars = HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://test/test".to_string(),
        ),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        (
            "COGNITO_USER_POOL_ID".to_string(),
            TEST_USER_POOL_ID.to_string(),
        ),
        ("COGNITO_CLIENT_ID".to_string(), "butler-test-client".to_string()),
        (
            "COGNITO_CLIENT_SECRET".to_string(),
            "butler-test-secret".to_string(),
        ),
    ]);

    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

/// Key set cache holding both fixture keys.
pub fn test_key_set() -> Result<Arc<KeySetCache>, anyhow::Error> {
    let document: KeySet = serde_json::from_value(jwks(&[&TEST_KEY_1, &TEST_KEY_2]))?;
    let key_set = Arc::new(KeySetCache::new());
    key_set.load(&document);
    Ok(key_set)
}

/// Test harness for spawning the Butler server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_health_flow_e2e(pool: PgPool) -> Result<()> {
///     let server = TestButlerServer::spawn(pool).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestButlerServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    key_set: Arc<KeySetCache>,
    _handle: JoinHandle<()>,
}

impl TestButlerServer {
    /// Spawn a server with the fixture key set and an accepting mock
    /// identity provider.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_with(
            pool,
            Arc::new(MockIdentityProvider::accepting()),
            test_key_set()?,
        )
        .await
    }

    /// Spawn a server with the fixture key set and the given identity
    /// provider.
    pub async fn spawn_with_provider(
        pool: PgPool,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, anyhow::Error> {
        Self::spawn_with(pool, identity_provider, test_key_set()?).await
    }

    /// Spawn a server with full control over its dependencies.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        pool: PgPool,
        identity_provider: Arc<dyn IdentityProvider>,
        key_set: Arc<KeySetCache>,
    ) -> Result<Self, anyhow::Error> {
        let config = test_config()?;

        let state = Arc::new(AppState {
            pool: pool.clone(),
            config: config.clone(),
            key_set: Arc::clone(&key_set),
            identity_provider,
        });

        // Build routes using the service's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            key_set,
            _handle: handle,
        })
    }

    /// Get reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
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

    /// Get the key set the server verifies tokens against.
    pub fn key_set(&self) -> &Arc<KeySetCache> {
        &self.key_set
    }
}

impl Drop for TestButlerServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released when the test ends.
        self._handle.abort();
    }
}
