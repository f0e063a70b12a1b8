pub use axum::Router;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::types::{AuthorizationConfig, ConnectionConfig, TokenProviderResult};
use crate::providers::uaa::UaaTokenClient;

pub const SERVICE_URL: &str = "https://sap.x";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn credentials(uaa_url: impl Into<String>) -> AuthorizationConfig {
    AuthorizationConfig::new(uaa_url, "c", "s")
}

pub fn connection(token: &str) -> ConnectionConfig {
    ConnectionConfig::new(Some(SERVICE_URL.to_string()), token)
}

pub fn provided(token: &str, refresh_token: Option<&str>) -> TokenProviderResult {
    TokenProviderResult {
        connection_config: connection(token),
        refresh_token: refresh_token.map(str::to_owned),
        expires_at: None,
    }
}

pub fn token_client() -> UaaTokenClient {
    UaaTokenClient::new(Duration::from_secs(5)).expect("token client")
}
