//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chirpy::auth::{AuthConfig, AuthManager};
use chirpy::config::ServerConfig;
use chirpy::database::{Database, SqliteDatabase};
use chirpy::server::{AppState, Server};
use serde_json::{json, Value};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const TEST_POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

/// Create a test authentication manager with the webhook key configured
pub fn create_test_auth_manager<D: Database>(db: Arc<D>) -> Arc<AuthManager<D>> {
    let config = AuthConfig::new(TEST_JWT_SECRET).with_polka_key(TEST_POLKA_KEY);
    Arc::new(AuthManager::new(db, config))
}

/// Create a test application state on the dev platform
pub async fn create_test_state() -> AppState<SqliteDatabase> {
    create_test_state_with(".", "dev").await
}

/// Create a test application state with a file server root and platform
pub async fn create_test_state_with(
    filepath_root: impl AsRef<Path>,
    platform: &str,
) -> AppState<SqliteDatabase> {
    let database = create_test_database().await;
    let auth_manager = create_test_auth_manager(Arc::clone(&database));

    AppState::new(
        auth_manager,
        database,
        platform,
        filepath_root.as_ref().to_path_buf(),
    )
}

/// Create a test server configuration with a random port
pub fn create_test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign a free port
        ..Default::default()
    }
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState<SqliteDatabase>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let server = Server::bind(&create_test_server_config(), state)
        .await
        .expect("Failed to bind test server");
    let addr = server.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        server
            .serve(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    (addr, shutdown_tx)
}

/// Register a user through the API and return the response body
pub async fn register_user(
    client: &reqwest::Client,
    addr: std::net::SocketAddr,
    email: &str,
    password: &str,
) -> Value {
    let response = client
        .post(format!("http://{}/api/users", addr))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    response.json().await.expect("Failed to parse user")
}

/// Log a user in through the API and return the response body
pub async fn login_user(
    client: &reqwest::Client,
    addr: std::net::SocketAddr,
    email: &str,
    password: &str,
) -> Value {
    let response = client
        .post(format!("http://{}/api/login", addr))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    response.json().await.expect("Failed to parse login response")
}
