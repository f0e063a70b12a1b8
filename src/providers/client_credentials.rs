use async_trait::async_trait;
use tracing::debug;

use crate::config::types::{AuthorizationConfig, TokenProviderResult};
use crate::error::AuthError;
use crate::helpers::jwt::jwt_expiration;
use crate::helpers::time::now;
use crate::providers::uaa::{Grant, UaaTokenClient};
use crate::providers::{into_result, ProviderOptions, TokenProvider};

/// Service-to-service provider. Never hands out a refresh token, every
/// acquisition is a fresh `client_credentials` grant.
#[derive(Debug, Clone)]
pub struct ClientCredentialsProvider {
    token_client: UaaTokenClient,
}

impl ClientCredentialsProvider {
    pub fn new(token_client: UaaTokenClient) -> Self {
        Self { token_client }
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn get_connection_config(
        &self,
        auth: &AuthorizationConfig,
        options: &ProviderOptions,
    ) -> Result<TokenProviderResult, AuthError> {
        auth.ensure_complete(&options.destination)?;
        let token = self.token_client.request_token(auth, Grant::ClientCredentials).await?;
        let mut result = into_result(token, options);
        // re-issued, not refreshed
        result.refresh_token = None;
        Ok(result)
    }

    /// Local `exp` check; the token is re-issued rather than probed.
    async fn validate_token(&self, token: &str, _service_url: Option<&str>) -> Option<bool> {
        let exp = jwt_expiration(token)?;
        let valid = now() < exp;
        debug!(valid, "client credentials token checked against exp claim");
        Some(valid)
    }
}
