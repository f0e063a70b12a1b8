use std::fmt;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::callback::{CallbackListener, CallbackOutcome};
use crate::browser::launcher::Browser;
use crate::config::settings::BrowserConfig;
use crate::config::types::AuthorizationConfig;
use crate::error::AuthError;
use crate::observability::metrics::get_metrics;
use crate::providers::uaa::{Grant, TokenResponse, UaaTokenClient};
use crate::utils::constants::AUTHORIZE_ENDPOINT_PATH;

/// Lifecycle of one interactive login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    ListenerStarted,
    AwaitingCallback,
    CodeReceived,
    Exchanging,
    Resolved,
    ErrorReceived,
    Timeout,
    Rejected,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct FlowTracker {
    state: FlowState,
}

impl FlowTracker {
    fn new() -> Self {
        Self { state: FlowState::Idle }
    }

    fn to(&mut self, next: FlowState) {
        debug!(from = %self.state, to = %next, "browser flow transition");
        self.state = next;
    }
}

/// Closes the listener on every exit, including a dropped future.
struct CloseOnDrop(CallbackListener);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// OAuth2 authorization-code login through the user's browser.
#[derive(Debug, Clone)]
pub struct BrowserAuthFlow {
    token_client: UaaTokenClient,
    browser: Browser,
    redirect_port: u16,
    timeout: Duration,
    cancel: CancellationToken,
}

impl BrowserAuthFlow {
    pub fn new(token_client: UaaTokenClient, config: &BrowserConfig) -> Self {
        Self {
            token_client,
            browser: config.browser,
            redirect_port: config.redirect_port,
            timeout: Duration::from_secs(config.timeout_seconds),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cancelling the token aborts a pending login with `Cancelled`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the login on the configured redirect port.
    pub async fn run(&self, auth: &AuthorizationConfig) -> Result<TokenResponse, AuthError> {
        let listener = CallbackListener::bind(self.redirect_port).await?;
        self.run_with_listener(auth, &listener).await
    }

    /// Runs the login against an already bound listener. The listener is
    /// closed when this returns.
    pub async fn run_with_listener(
        &self,
        auth: &AuthorizationConfig,
        listener: &CallbackListener,
    ) -> Result<TokenResponse, AuthError> {
        let guard = CloseOnDrop(listener.clone());
        let mut tracker = FlowTracker::new();
        tracker.to(FlowState::ListenerStarted);

        let result = self.drive(auth, listener, &mut tracker).await;
        guard.0.close();

        let outcome = match (&result, tracker.state) {
            (Ok(_), _) => "success",
            (Err(AuthError::Cancelled), _) => "cancelled",
            (Err(_), FlowState::Timeout) => "timeout",
            (Err(_), FlowState::ErrorReceived) => "callback_error",
            (Err(_), FlowState::Rejected) => "exchange_failed",
            (Err(_), _) => "failed",
        };
        get_metrics().await.browser_flows.with_label_values(&[outcome]).inc();
        result
    }

    async fn drive(
        &self,
        auth: &AuthorizationConfig,
        listener: &CallbackListener,
        tracker: &mut FlowTracker,
    ) -> Result<TokenResponse, AuthError> {
        let receiver = listener
            .take_receiver()
            .await
            .ok_or_else(|| AuthError::configuration("callback listener was already used by another login"))?;
        let redirect_uri = listener.redirect_uri();
        let url = authorization_url(auth, &redirect_uri)?;

        self.present(&url);
        tracker.to(FlowState::AwaitingCallback);

        let deadline = Instant::now() + self.timeout;
        let outcome = tokio::select! {
            received = receiver => received,
            _ = sleep_until(deadline) => {
                tracker.to(FlowState::Timeout);
                warn!(timeout_secs = self.timeout.as_secs(), "no authorization callback received");
                return Err(AuthError::AuthTimeout { seconds: self.timeout.as_secs() });
            }
            _ = self.cancel.cancelled() => {
                info!("browser login cancelled");
                return Err(AuthError::Cancelled);
            }
        };
        listener.close();

        let code = match outcome {
            Ok(CallbackOutcome::Code(code)) => code,
            Ok(CallbackOutcome::Error { error, description }) => {
                tracker.to(FlowState::ErrorReceived);
                warn!(error = %error, "authorization server redirected with an error");
                return Err(AuthError::OAuthCallbackError { error, description });
            }
            // sender gone: the listener stopped before delivering
            Err(_) => return Err(AuthError::Cancelled),
        };
        tracker.to(FlowState::CodeReceived);

        tracker.to(FlowState::Exchanging);
        let grant = Grant::AuthorizationCode {
            code: &code,
            redirect_uri: &redirect_uri,
        };
        let exchanged = tokio::select! {
            exchanged = self.token_client.request_token(auth, grant) => exchanged,
            _ = self.cancel.cancelled() => return Err(AuthError::Cancelled),
        };

        match exchanged {
            Ok(token) => {
                tracker.to(FlowState::Resolved);
                info!("browser login completed");
                Ok(token)
            }
            Err(e) => {
                tracker.to(FlowState::Rejected);
                Err(e)
            }
        }
    }

    fn present(&self, url: &str) {
        if self.browser.is_headless() {
            eprintln!("Open the following URL in a browser to log in:\n\n  {}\n", url);
            return;
        }
        match self.browser.open(url) {
            Ok(()) => info!(browser = ?self.browser, "opened browser for login"),
            Err(e) => {
                warn!(error = %e, browser = ?self.browser, "failed to launch browser");
                eprintln!("Could not open a browser. Open this URL to log in:\n\n  {}\n", url);
            }
        }
    }
}

/// `{uaaUrl}/oauth/authorize` with the code-flow query.
pub fn authorization_url(auth: &AuthorizationConfig, redirect_uri: &str) -> Result<String, AuthError> {
    let base = format!("{}{}", auth.uaa_url.trim_end_matches('/'), AUTHORIZE_ENDPOINT_PATH);
    let mut url = Url::parse(&base)
        .map_err(|e| AuthError::configuration(format!("invalid UAA URL '{}': {}", auth.uaa_url, e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", &auth.uaa_client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code");
    Ok(url.into())
}
