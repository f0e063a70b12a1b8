use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;

use crate::config::types::{AuthorizationConfig, ConnectionConfig, TokenProviderResult};
use crate::error::{AuthError, StoreError};
use crate::providers::{ProviderOptions, TokenProvider};
use crate::stores::SessionStore;
use crate::validator::ValidateToken;

mock! {
    pub Provider {}

    #[async_trait::async_trait]
    impl TokenProvider for Provider {
        async fn get_connection_config(&self, auth: &AuthorizationConfig, options: &ProviderOptions) -> Result<TokenProviderResult, AuthError>;
    }
}

mock! {
    pub Validator {}

    #[async_trait::async_trait]
    impl ValidateToken for Validator {
        async fn validate(&self, token: &str, service_url: &str) -> bool;
    }
}

mock! {
    pub Sessions {}

    #[async_trait::async_trait]
    impl SessionStore for Sessions {
        async fn get_authorization_config(&self, destination: &str) -> Result<Option<AuthorizationConfig>, StoreError>;
        async fn set_authorization_config(&self, destination: &str, config: AuthorizationConfig) -> Result<(), StoreError>;
        async fn get_connection_config(&self, destination: &str) -> Result<Option<ConnectionConfig>, StoreError>;
        async fn set_connection_config(&self, destination: &str, config: ConnectionConfig) -> Result<(), StoreError>;
    }
}

/// Validator answering the same verdict every time.
pub fn validator(valid: bool) -> MockValidator {
    let mut mock = MockValidator::new();
    mock.expect_validate().returning(move |_, _| valid);
    mock
}

/// Provider that takes a while and counts its calls.
pub struct SlowProvider {
    pub calls: AtomicUsize,
    pub delay: Duration,
    /// answer of `validate_token`
    pub verdict: Option<bool>,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            verdict: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for SlowProvider {
    async fn get_connection_config(
        &self,
        _auth: &AuthorizationConfig,
        options: &ProviderOptions,
    ) -> Result<TokenProviderResult, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        Ok(TokenProviderResult {
            connection_config: ConnectionConfig::new(options.service_url.clone(), format!("slow-{}", n)),
            refresh_token: Some(format!("slow-refresh-{}", n)),
            expires_at: None,
        })
    }

    async fn validate_token(&self, _token: &str, _service_url: Option<&str>) -> Option<bool> {
        self.verdict
    }
}
