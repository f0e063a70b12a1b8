use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::broker::single_flight::SingleFlight;
use crate::cache::TokenCache;
use crate::config::settings::DirectUaa;
use crate::config::types::{AuthorizationConfig, ConnectionConfig, SessionKind, TokenProviderResult};
use crate::error::AuthError;
use crate::helpers::jwt::jwt_expiration;
use crate::observability::metrics::get_metrics;
use crate::providers::uaa::{Grant, UaaTokenClient};
use crate::providers::{into_result, ProviderOptions, TokenProvider};
use crate::stores::{ServiceKeyStore, SessionStore};
use crate::validator::ValidateToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Get,
    Refresh,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Refresh => "refresh",
        }
    }
}

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cache,
    Session,
    RefreshGrant,
    DirectUaa,
    Bootstrap,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Cache => "cache",
            TokenSource::Session => "session",
            TokenSource::RefreshGrant => "refresh_grant",
            TokenSource::DirectUaa => "direct_uaa",
            TokenSource::Bootstrap => "bootstrap",
        }
    }
}

/// Everything read for one resolution. Store values are re-read per call.
struct Attempt {
    destination: String,
    session_connection: Option<ConnectionConfig>,
    session_authorization: Option<AuthorizationConfig>,
    key_loaded: bool,
    key_connection: Option<ConnectionConfig>,
    key_authorization: Option<AuthorizationConfig>,
    service_url: Option<String>,
    tried: Vec<String>,
}

impl Attempt {
    fn session_credentials(&self) -> Option<&AuthorizationConfig> {
        self.session_authorization.as_ref().filter(|a| a.has_uaa_credentials())
    }
}

/// Resolves a bearer token for a destination.
///
/// `get_token` order: cache, stored session token (probed), refresh grant
/// through the provider, direct UAA grant, bootstrap from the service key.
/// `refresh_token` skips the cache and the stored token.
pub struct AuthBroker {
    pub(crate) session_store: Arc<dyn SessionStore>,
    pub(crate) service_key_store: Option<Arc<dyn ServiceKeyStore>>,
    pub(crate) token_provider: Option<Arc<dyn TokenProvider>>,
    pub(crate) validator: Arc<dyn ValidateToken>,
    pub(crate) token_client: UaaTokenClient,
    pub(crate) cache: TokenCache,
    pub(crate) session_kind: SessionKind,
    pub(crate) allow_browser_auth: bool,
    pub(crate) direct_uaa: DirectUaa,
    pub(crate) flights: SingleFlight,
}

impl AuthBroker {
    /// A valid token, doing as little work as possible.
    pub async fn get_token(&self, destination: &str) -> Result<String, AuthError> {
        self.run(destination, Operation::Get).await
    }

    /// A freshly exchanged token, even if the current one is still valid.
    pub async fn refresh_token(&self, destination: &str) -> Result<String, AuthError> {
        self.run(destination, Operation::Refresh).await
    }

    pub async fn clear_cache(&self, destination: &str) {
        self.cache.clear(destination).await;
    }

    pub async fn clear_all_cache(&self) {
        self.cache.clear_all().await;
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn session_kind(&self) -> SessionKind {
        self.session_kind
    }

    async fn run(&self, destination: &str, operation: Operation) -> Result<String, AuthError> {
        let metrics = get_metrics().await;
        metrics.token_requests.with_label_values(&[operation.as_str()]).inc();
        let timer = metrics
            .token_resolution_duration
            .with_label_values(&[operation.as_str()])
            .start_timer();

        let flight = self.flights.acquire(destination).await;
        let result = self.resolve(destination, operation).await;
        drop(flight);
        timer.observe_duration();

        match result {
            Ok((token, source)) => {
                metrics.token_resolutions.with_label_values(&[source.as_str()]).inc();
                info!(destination, operation = operation.as_str(), source = source.as_str(), "token resolved");
                Ok(token)
            }
            Err(e) => {
                metrics.token_resolution_failures.with_label_values(&[e.kind()]).inc();
                warn!(destination, operation = operation.as_str(), error = %e, "token resolution failed");
                Err(e)
            }
        }
    }

    async fn resolve(&self, destination: &str, operation: Operation) -> Result<(String, TokenSource), AuthError> {
        if operation == Operation::Get {
            if let Some(cached) = self.cache.get(destination).await {
                debug!(destination, "cache hit");
                return Ok((cached.token, TokenSource::Cache));
            }
        }

        let mut attempt = self.load(destination).await?;

        if operation == Operation::Get {
            if let Some(token) = self.stored_token(&mut attempt).await {
                return Ok((token, TokenSource::Session));
            }
        }

        if let Some(token) = self.refresh_grant(&mut attempt).await? {
            return Ok((token, TokenSource::RefreshGrant));
        }
        if let Some(token) = self.direct_uaa(&mut attempt).await? {
            return Ok((token, TokenSource::DirectUaa));
        }
        if let Some(token) = self.bootstrap(&mut attempt).await? {
            return Ok((token, TokenSource::Bootstrap));
        }

        Err(AuthError::AuthenticationExhausted {
            destination: attempt.destination,
            tried: attempt.tried,
        })
    }

    /// Reads the session, and the service key when the session cannot
    /// answer on its own.
    async fn load(&self, destination: &str) -> Result<Attempt, AuthError> {
        let session_connection = self.session_store.get_connection_config(destination).await?;
        let session_authorization = self.session_store.get_authorization_config(destination).await?;

        let mut attempt = Attempt {
            destination: destination.to_string(),
            session_connection,
            session_authorization,
            key_loaded: false,
            key_connection: None,
            key_authorization: None,
            service_url: None,
            tried: Vec::new(),
        };

        if attempt.session_connection.is_none() && attempt.session_authorization.is_none() {
            self.load_service_key(&mut attempt).await?;
            if attempt.key_authorization.is_none() && attempt.key_connection.is_none() {
                return Err(AuthError::NoAuthenticationFound {
                    destination: destination.to_string(),
                });
            }
        }

        attempt.service_url = attempt
            .session_connection
            .as_ref()
            .and_then(|c| c.service_url())
            .map(str::to_owned);
        if attempt.service_url.is_none() {
            self.load_service_key(&mut attempt).await?;
            attempt.service_url = attempt
                .key_connection
                .as_ref()
                .and_then(|c| c.service_url())
                .map(str::to_owned);
        }

        if attempt.service_url.is_none() && self.session_kind.requires_service_url() {
            return Err(AuthError::MissingServiceUrl {
                destination: destination.to_string(),
            });
        }

        Ok(attempt)
    }

    async fn load_service_key(&self, attempt: &mut Attempt) -> Result<(), AuthError> {
        if attempt.key_loaded {
            return Ok(());
        }
        attempt.key_loaded = true;
        if let Some(store) = &self.service_key_store {
            attempt.key_authorization = store.get_authorization_config(&attempt.destination).await?;
            attempt.key_connection = store.get_connection_config(&attempt.destination).await?;
        }
        Ok(())
    }

    /// Probes the token held by the session.
    async fn stored_token(&self, attempt: &mut Attempt) -> Option<String> {
        let Some(token) = attempt
            .session_connection
            .as_ref()
            .and_then(|c| c.token())
            .map(str::to_owned)
        else {
            attempt.tried.push("session token: none stored".to_string());
            return None;
        };

        if self.is_valid(&token, attempt.service_url.as_deref()).await {
            self.cache.set(&attempt.destination, token.clone(), jwt_expiration(&token)).await;
            return Some(token);
        }

        debug!(destination = %attempt.destination, "stored token rejected");
        attempt.tried.push("session token: rejected by validator".to_string());
        None
    }

    async fn is_valid(&self, token: &str, service_url: Option<&str>) -> bool {
        if let Some(provider) = &self.token_provider {
            if let Some(valid) = provider.validate_token(token, service_url).await {
                return valid;
            }
        }
        match service_url {
            Some(url) => self.validator.validate(token, url).await,
            None => {
                debug!("no service URL to probe, keeping stored token");
                true
            }
        }
    }

    /// Step 1: refresh grant through the provider.
    async fn refresh_grant(&self, attempt: &mut Attempt) -> Result<Option<String>, AuthError> {
        let Some(provider) = &self.token_provider else {
            return Ok(None);
        };
        let Some(auth) = attempt
            .session_authorization
            .clone()
            .filter(|a| a.refresh_token().is_some())
        else {
            attempt.tried.push("refresh token: none in session".to_string());
            return Ok(None);
        };
        if !auth.has_uaa_credentials() {
            attempt.tried.push("refresh token: session lacks UAA credentials".to_string());
            return Ok(None);
        }

        debug!(destination = %attempt.destination, "refreshing through provider");
        match provider.get_connection_config(&auth, &self.options(attempt)).await {
            Ok(result) => Ok(Some(self.complete(attempt, &auth, result).await)),
            Err(e) => fall_through(attempt, "refresh token", e),
        }
    }

    /// Step 2: the broker posts to the token endpoint itself. Failures never
    /// surface directly, the next step or the final report carries them.
    async fn direct_uaa(&self, attempt: &mut Attempt) -> Result<Option<String>, AuthError> {
        if !self.direct_uaa.enabled(self.token_provider.is_some()) {
            return Ok(None);
        }

        let auth = match attempt.session_credentials() {
            Some(auth) => Some(auth.clone()),
            None => {
                self.load_service_key(attempt).await?;
                attempt.key_authorization.clone().filter(|a| a.has_uaa_credentials())
            }
        };
        let Some(auth) = auth else {
            attempt.tried.push("direct UAA: no UAA credentials".to_string());
            return Ok(None);
        };

        let grant = match auth.refresh_token() {
            Some(refresh_token) => Grant::RefreshToken(refresh_token),
            None => Grant::ClientCredentials,
        };
        debug!(destination = %attempt.destination, grant = grant.name(), "trying direct UAA");

        match self.token_client.request_token(&auth, grant).await {
            Ok(response) => {
                let result = into_result(response, &self.options(attempt));
                Ok(Some(self.complete(attempt, &auth, result).await))
            }
            Err(e) => {
                warn!(destination = %attempt.destination, error = %e, "direct UAA failed");
                attempt.tried.push(format!("direct UAA: {}", e));
                Ok(None)
            }
        }
    }

    /// Step 0: acquisition grant from the service key, or the session's own
    /// UAA credentials.
    async fn bootstrap(&self, attempt: &mut Attempt) -> Result<Option<String>, AuthError> {
        let Some(provider) = &self.token_provider else {
            return Ok(None);
        };
        self.load_service_key(attempt).await?;

        let key = attempt.key_authorization.clone();
        let auth = key
            .clone()
            .filter(|a| a.has_uaa_credentials())
            .or_else(|| attempt.session_credentials().cloned())
            .or(key)
            .or_else(|| attempt.session_authorization.clone());
        let Some(auth) = auth else {
            attempt.tried.push("service key: none".to_string());
            return Ok(None);
        };
        let auth = auth.with_refresh_token(None);
        auth.ensure_complete(&attempt.destination)?;

        debug!(destination = %attempt.destination, "bootstrapping through provider");
        match provider.get_connection_config(&auth, &self.options(attempt)).await {
            Ok(result) => Ok(Some(self.complete(attempt, &auth, result).await)),
            Err(e) => fall_through(attempt, "service key", e),
        }
    }

    fn options(&self, attempt: &Attempt) -> ProviderOptions {
        ProviderOptions {
            destination: attempt.destination.clone(),
            service_url: attempt.service_url.clone(),
            allow_browser_auth: self.allow_browser_auth,
        }
    }

    /// Persists an acquired token and caches it. Store writes are best
    /// effort, the token is returned either way.
    async fn complete(&self, attempt: &Attempt, used: &AuthorizationConfig, result: TokenProviderResult) -> String {
        let destination = attempt.destination.as_str();
        let TokenProviderResult {
            connection_config,
            refresh_token,
            expires_at,
        } = result;
        let token = connection_config.authorization_token;
        let expires_at = expires_at.or_else(|| jwt_expiration(&token));

        let previous = attempt
            .session_connection
            .clone()
            .or_else(|| attempt.key_connection.clone())
            .unwrap_or_default();
        let connection = ConnectionConfig {
            service_url: connection_config.service_url.or_else(|| attempt.service_url.clone()),
            authorization_token: token.clone(),
            sap_client: connection_config.sap_client.or(previous.sap_client),
            language: connection_config.language.or(previous.language),
        };
        if let Err(e) = self.session_store.set_connection_config(destination, connection).await {
            warn!(destination, error = %e, "failed to persist connection config, token still returned");
        }

        // keep the previous refresh token when the grant did not rotate it
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| used.refresh_token().map(str::to_owned));
        let authorization = used.clone().with_refresh_token(refresh_token);
        if attempt.session_authorization.as_ref() != Some(&authorization) {
            if let Err(e) = self.session_store.set_authorization_config(destination, authorization).await {
                warn!(destination, error = %e, "failed to persist authorization config, token still returned");
            }
        }

        self.cache.set(destination, token.clone(), expires_at).await;
        token
    }
}

/// Terminal errors end the chain; anything else is recorded and the next
/// source is tried.
fn fall_through(attempt: &mut Attempt, source: &str, error: AuthError) -> Result<Option<String>, AuthError> {
    if error.is_terminal() {
        return Err(error);
    }
    warn!(destination = %attempt.destination, source, error = %error, "token source failed");
    attempt.tried.push(format!("{}: {}", source, error));
    Ok(None)
}
