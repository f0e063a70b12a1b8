//! Token providers: strategies that turn UAA credentials into a token.

pub mod browser;
pub mod client_credentials;
pub mod uaa;

pub use browser::BrowserTokenProvider;
pub use client_credentials::ClientCredentialsProvider;
pub use uaa::{Grant, TokenResponse, UaaTokenClient};

use async_trait::async_trait;

use crate::config::types::{AuthorizationConfig, ConnectionConfig, TokenProviderResult};
use crate::error::AuthError;

/// Per-call context handed to a provider by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOptions {
    pub destination: String,
    pub service_url: Option<String>,
    /// false forbids launching an interactive login
    pub allow_browser_auth: bool,
}

/// Performs the network call that acquires or refreshes a token.
///
/// A refresh token in `auth` asks for a refresh grant; without one the
/// provider runs its own acquisition grant.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_connection_config(
        &self,
        auth: &AuthorizationConfig,
        options: &ProviderOptions,
    ) -> Result<TokenProviderResult, AuthError>;

    /// Protocol-specific validity check replacing the HTTP probe.
    /// `None` leaves the decision to the broker's validator.
    async fn validate_token(&self, _token: &str, _service_url: Option<&str>) -> Option<bool> {
        None
    }
}

/// Wraps a token endpoint answer into what the broker persists.
pub(crate) fn into_result(token: TokenResponse, options: &ProviderOptions) -> TokenProviderResult {
    let expires_at = token.expires_at();
    TokenProviderResult {
        connection_config: ConnectionConfig::new(options.service_url.clone(), token.access_token),
        refresh_token: token.refresh_token,
        expires_at,
    }
}
