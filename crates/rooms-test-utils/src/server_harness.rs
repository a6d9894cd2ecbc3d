//! Test server harness for E2E testing
//!
//! Provides `TestRoomsServer` for spawning real rooms service instances in
//! tests, with the identity provider's JWKS endpoint mocked by wiremock.

use crate::crypto_fixtures::{TestClaims, TestKeypair};
use metrics_exporter_prometheus::PrometheusBuilder;
use rooms_service::config::Config;
use rooms_service::routes::{self, AppState};
use rooms_service::services::{DbRoomSettingsGetter, RoomSettingsGetter};
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Test harness for spawning the rooms service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_health_flow_e2e(pool: PgPool) -> Result<()> {
///     let server = TestRoomsServer::spawn(pool).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestRoomsServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    keypair: TestKeypair,
    _jwks_server: MockServer,
    _handle: JoinHandle<()>,
}

impl TestRoomsServer {
    /// Spawn a server backed by the real settings getter.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::start(pool, HashMap::new(), None).await
    }

    /// Spawn a server with a substitute settings getter.
    pub async fn spawn_with_settings(
        pool: PgPool,
        settings_getter: Arc<dyn RoomSettingsGetter>,
    ) -> Result<Self, anyhow::Error> {
        Self::start(pool, HashMap::new(), Some(settings_getter)).await
    }

    /// Spawn a server with extra configuration variables.
    pub async fn spawn_with_vars(
        pool: PgPool,
        vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        Self::start(pool, vars, None).await
    }

    async fn start(
        pool: PgPool,
        extra_vars: HashMap<String, String>,
        settings_getter: Option<Arc<dyn RoomSettingsGetter>>,
    ) -> Result<Self, anyhow::Error> {
        let keypair = TestKeypair::new(1, "rooms-test-key")?;

        let jwks_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "keys": [keypair.jwk_json()] })),
            )
            .mount(&jwks_server)
            .await;

        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "AUTH_JWKS_URL".to_string(),
                format!("{}{}", jwks_server.uri(), JWKS_PATH),
            ),
            ("ROOMS_PROVIDER".to_string(), "default".to_string()),
        ]);
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let settings_getter = settings_getter
            .unwrap_or_else(|| Arc::new(DbRoomSettingsGetter::new(pool.clone())));

        let state = Arc::new(AppState {
            pool: pool.clone(),
            config: config.clone(),
            settings_getter,
        });

        // Built but not installed: tests must not fight over the global recorder.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

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
            keypair,
            _jwks_server: jwks_server,
            _handle: handle,
        })
    }

    /// A valid bearer token for `user_id`.
    pub fn token_for(&self, user_id: Uuid) -> Result<String, anyhow::Error> {
        Ok(self
            .keypair
            .sign_token(&TestClaims::valid_for(user_id.to_string()))?)
    }

    /// Sign arbitrary claims with the server's trusted key.
    pub fn sign(&self, claims: &TestClaims) -> Result<String, anyhow::Error> {
        Ok(self.keypair.sign_token(claims)?)
    }

    /// Get reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestRoomsServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
