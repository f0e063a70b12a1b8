use async_trait::async_trait;
use tracing::{debug, info};

use crate::browser::flow::BrowserAuthFlow;
use crate::config::types::{AuthorizationConfig, TokenProviderResult};
use crate::error::AuthError;
use crate::providers::uaa::{Grant, UaaTokenClient};
use crate::providers::{into_result, ProviderOptions, TokenProvider};

/// User-facing provider: refreshes silently when it can, otherwise runs
/// the browser login if the caller allows it.
#[derive(Debug, Clone)]
pub struct BrowserTokenProvider {
    token_client: UaaTokenClient,
    flow: BrowserAuthFlow,
}

impl BrowserTokenProvider {
    pub fn new(token_client: UaaTokenClient, flow: BrowserAuthFlow) -> Self {
        Self { token_client, flow }
    }
}

#[async_trait]
impl TokenProvider for BrowserTokenProvider {
    async fn get_connection_config(
        &self,
        auth: &AuthorizationConfig,
        options: &ProviderOptions,
    ) -> Result<TokenProviderResult, AuthError> {
        auth.ensure_complete(&options.destination)?;

        if let Some(refresh_token) = auth.refresh_token() {
            debug!(destination = %options.destination, "refreshing with stored refresh token");
            let token = self
                .token_client
                .request_token(auth, Grant::RefreshToken(refresh_token))
                .await?;
            let mut result = into_result(token, options);
            // UAA may not rotate the refresh token
            if result.refresh_token.is_none() {
                result.refresh_token = Some(refresh_token.to_string());
            }
            return Ok(result);
        }

        if !options.allow_browser_auth {
            return Err(AuthError::BrowserAuthRequired {
                destination: options.destination.clone(),
            });
        }

        info!(destination = %options.destination, "starting browser login");
        let token = self.flow.run(auth).await?;
        Ok(into_result(token, options))
    }
}
