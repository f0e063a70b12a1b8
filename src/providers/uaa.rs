use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::types::AuthorizationConfig;
use crate::error::AuthError;
use crate::helpers::jwt::jwt_expiration;
use crate::helpers::time::expires_at_from_seconds;
use crate::utils::constants::{
    GRANT_AUTHORIZATION_CODE, GRANT_CLIENT_CREDENTIALS, GRANT_REFRESH_TOKEN, TOKEN_ENDPOINT_PATH,
};

/// Grant sent to `{uaaUrl}/oauth/token`.
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    AuthorizationCode { code: &'a str, redirect_uri: &'a str },
    RefreshToken(&'a str),
    ClientCredentials,
}

impl Grant<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode { .. } => GRANT_AUTHORIZATION_CODE,
            Grant::RefreshToken(_) => GRANT_REFRESH_TOKEN,
            Grant::ClientCredentials => GRANT_CLIENT_CREDENTIALS,
        }
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![("grant_type", self.name())];
        match *self {
            Grant::AuthorizationCode { code, redirect_uri } => {
                form.push(("code", code));
                form.push(("redirect_uri", redirect_uri));
            }
            Grant::RefreshToken(refresh_token) => form.push(("refresh_token", refresh_token)),
            Grant::ClientCredentials => {}
        }
        form
    }
}

/// Successful token endpoint answer.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// From `expires_in`, else from the JWT `exp` claim.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(expires_at_from_seconds)
            .or_else(|| jwt_expiration(&self.access_token))
    }
}

pub fn token_endpoint(uaa_url: &str) -> String {
    format!("{}{}", uaa_url.trim_end_matches('/'), TOKEN_ENDPOINT_PATH)
}

/// Client for the UAA token endpoint, shared by every grant.
#[derive(Debug, Clone)]
pub struct UaaTokenClient {
    client: Client,
    timeout: Duration,
}

impl UaaTokenClient {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn request_token(&self, auth: &AuthorizationConfig, grant: Grant<'_>) -> Result<TokenResponse, AuthError> {
        let url = token_endpoint(&auth.uaa_url);
        debug!(url = %url, grant = grant.name(), "requesting token");

        let response = self
            .client
            .post(&url)
            .basic_auth(&auth.uaa_client_id, Some(&auth.uaa_client_secret))
            .form(&grant.form())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AuthError::token_exchange_failed(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(AuthError::token_exchange_failed(format!(
                "{} grant rejected with HTTP {}: {}",
                grant.name(),
                status,
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::token_exchange_failed(format!("malformed token response: {}", e)))?;

        if token.access_token.trim().is_empty() {
            return Err(AuthError::token_exchange_failed("token response carries an empty access_token"));
        }

        info!(grant = grant.name(), rotated = token.refresh_token.is_some(), "token issued");
        Ok(token)
    }
}
