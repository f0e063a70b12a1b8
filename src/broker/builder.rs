use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::broker::auth_broker::AuthBroker;
use crate::broker::single_flight::SingleFlight;
use crate::browser::flow::BrowserAuthFlow;
use crate::cache::TokenCache;
use crate::config::settings::{BrokerConfig, BrokerSettings, ProviderKind};
use crate::error::AuthError;
use crate::providers::uaa::UaaTokenClient;
use crate::providers::{BrowserTokenProvider, ClientCredentialsProvider, TokenProvider};
use crate::stores::file::search_paths_from_env;
use crate::stores::{FileServiceKeyStore, FileSessionStore, ServiceKeyStore, SessionStore};
use crate::validator::{TokenValidator, ValidateToken};

/// Wires an [`AuthBroker`]. Only the session store is mandatory.
#[derive(Default)]
pub struct AuthBrokerBuilder {
    session_store: Option<Arc<dyn SessionStore>>,
    service_key_store: Option<Arc<dyn ServiceKeyStore>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    validator: Option<Arc<dyn ValidateToken>>,
    token_client: Option<UaaTokenClient>,
    cache: Option<TokenCache>,
    settings: BrokerSettings,
}

impl AuthBrokerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// File stores and the provider named by `config`.
    pub fn from_config(config: &BrokerConfig, cancel: CancellationToken) -> Result<Self, AuthError> {
        let settings = config.settings.clone();

        let key_store = match &config.stores.service_keys_path {
            Some(path) => FileServiceKeyStore::new(vec![PathBuf::from(path)]),
            None => FileServiceKeyStore::from_env(),
        };
        let sessions_dir = config
            .stores
            .sessions_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| search_paths_from_env().into_iter().next())
            .unwrap_or_else(|| PathBuf::from("."));
        debug!(sessions = %sessions_dir.display(), "using file stores");

        let token_client = UaaTokenClient::new(Duration::from_secs(settings.token_exchange_timeout_seconds))?;
        let provider: Arc<dyn TokenProvider> = match settings.provider {
            ProviderKind::Browser => {
                let flow = BrowserAuthFlow::new(token_client.clone(), &settings.browser).with_cancellation(cancel);
                Arc::new(BrowserTokenProvider::new(token_client.clone(), flow))
            }
            ProviderKind::ClientCredentials => Arc::new(ClientCredentialsProvider::new(token_client.clone())),
        };

        Ok(Self::new()
            .session_store(FileSessionStore::new(sessions_dir, settings.session_kind))
            .service_key_store(key_store)
            .shared_token_provider(provider)
            .token_client(token_client)
            .settings(settings))
    }

    pub fn session_store(mut self, store: impl SessionStore + 'static) -> Self {
        self.session_store = Some(Arc::new(store));
        self
    }

    pub fn shared_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn service_key_store(mut self, store: impl ServiceKeyStore + 'static) -> Self {
        self.service_key_store = Some(Arc::new(store));
        self
    }

    pub fn shared_service_key_store(mut self, store: Arc<dyn ServiceKeyStore>) -> Self {
        self.service_key_store = Some(store);
        self
    }

    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    pub fn shared_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn validator(mut self, validator: impl ValidateToken + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Client used by the direct UAA step.
    pub fn token_client(mut self, client: UaaTokenClient) -> Self {
        self.token_client = Some(client);
        self
    }

    /// Brokers built with clones of one cache share its entries.
    pub fn cache(mut self, cache: TokenCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(mut self, settings: BrokerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn allow_browser_auth(mut self, allow: bool) -> Self {
        self.settings.allow_browser_auth = allow;
        self
    }

    pub fn build(self) -> Result<AuthBroker, AuthError> {
        let session_store = self
            .session_store
            .ok_or_else(|| AuthError::configuration("a session store is required"))?;

        let validator: Arc<dyn ValidateToken> = match self.validator {
            Some(v) => v,
            None => Arc::new(TokenValidator::new(&self.settings.validator)?),
        };
        let token_client = match self.token_client {
            Some(c) => c,
            None => UaaTokenClient::new(Duration::from_secs(self.settings.token_exchange_timeout_seconds))?,
        };

        Ok(AuthBroker {
            session_store,
            service_key_store: self.service_key_store,
            token_provider: self.token_provider,
            validator,
            token_client,
            cache: self.cache.unwrap_or_default(),
            session_kind: self.settings.session_kind,
            allow_browser_auth: self.settings.allow_browser_auth,
            direct_uaa: self.settings.direct_uaa,
            flights: SingleFlight::new(),
        })
    }
}

impl AuthBroker {
    pub fn builder() -> AuthBrokerBuilder {
        AuthBrokerBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::StoresConfig;
    use crate::config::types::SessionKind;
    use crate::stores::MemorySessionStore;

    #[test]
    fn session_store_is_required() {
        let err = AuthBrokerBuilder::new().build().err().unwrap();
        assert_eq!(err.kind(), "Configuration");
    }

    #[test]
    fn defaults_follow_settings() {
        let mut settings = BrokerSettings::default();
        settings.session_kind = SessionKind::Xsuaa;
        settings.allow_browser_auth = false;

        let broker = AuthBroker::builder()
            .session_store(MemorySessionStore::new())
            .settings(settings)
            .build()
            .unwrap();
        assert_eq!(broker.session_kind(), SessionKind::Xsuaa);
        assert!(!broker.allow_browser_auth);
        assert!(broker.token_provider.is_none());
    }

    #[test]
    fn from_config_wires_file_stores_and_browser_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config = BrokerConfig {
            settings: BrokerSettings::default(),
            stores: StoresConfig {
                service_keys_path: Some(dir.path().display().to_string()),
                sessions_path: Some(dir.path().display().to_string()),
            },
        };

        let broker = AuthBrokerBuilder::from_config(&config, CancellationToken::new())
            .unwrap()
            .allow_browser_auth(false)
            .build()
            .unwrap();
        assert!(broker.token_provider.is_some());
        assert!(broker.service_key_store.is_some());
        assert!(!broker.allow_browser_auth);
    }
}
