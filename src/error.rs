use thiserror::Error;

/// Errors surfaced by the broker. Every message starts with the kind name
/// so CLI callers can branch on it.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("NoAuthenticationFound: no session and no service key for destination '{destination}'")]
    NoAuthenticationFound { destination: String },

    #[error("MissingServiceUrl: destination '{destination}' has no service URL")]
    MissingServiceUrl { destination: String },

    #[error("InvalidServiceKey: destination '{destination}' is missing {}", .missing.join(", "))]
    InvalidServiceKey {
        destination: String,
        missing: Vec<&'static str>,
    },

    #[error("AuthenticationExhausted: no valid token for destination '{destination}', tried: {}", .tried.join("; "))]
    AuthenticationExhausted { destination: String, tried: Vec<String> },

    #[error("BrowserAuthRequired: destination '{destination}' needs an interactive login but browser auth is disabled")]
    BrowserAuthRequired { destination: String },

    #[error("OAuthCallbackError: {error} - {description}")]
    OAuthCallbackError { error: String, description: String },

    #[error("AuthTimeout: no authorization callback within {seconds}s")]
    AuthTimeout { seconds: u64 },

    #[error("TokenExchangeFailed: {0}")]
    TokenExchangeFailed(String),

    #[error("Cancelled: interactive login was cancelled")]
    Cancelled,

    #[error("Store: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration: {0}")]
    Configuration(String),
}

impl AuthError {
    pub fn token_exchange_failed(message: impl Into<String>) -> Self {
        AuthError::TokenExchangeFailed(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AuthError::Configuration(message.into())
    }

    /// Kind name, identical to the message prefix.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::NoAuthenticationFound { .. } => "NoAuthenticationFound",
            AuthError::MissingServiceUrl { .. } => "MissingServiceUrl",
            AuthError::InvalidServiceKey { .. } => "InvalidServiceKey",
            AuthError::AuthenticationExhausted { .. } => "AuthenticationExhausted",
            AuthError::BrowserAuthRequired { .. } => "BrowserAuthRequired",
            AuthError::OAuthCallbackError { .. } => "OAuthCallbackError",
            AuthError::AuthTimeout { .. } => "AuthTimeout",
            AuthError::TokenExchangeFailed(_) => "TokenExchangeFailed",
            AuthError::Cancelled => "Cancelled",
            AuthError::Store(_) => "Store",
            AuthError::Configuration(_) => "Configuration",
        }
    }

    /// Process exit code used by the CLI, one per kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            AuthError::NoAuthenticationFound { .. } => 2,
            AuthError::MissingServiceUrl { .. } => 3,
            AuthError::InvalidServiceKey { .. } => 4,
            AuthError::AuthenticationExhausted { .. } => 5,
            AuthError::BrowserAuthRequired { .. } => 6,
            AuthError::OAuthCallbackError { .. } => 7,
            AuthError::AuthTimeout { .. } => 8,
            AuthError::TokenExchangeFailed(_) => 9,
            AuthError::Store(_) => 10,
            AuthError::Configuration(_) => 11,
            AuthError::Cancelled => 130,
        }
    }

    /// Errors that end the fallback chain as themselves instead of being
    /// folded into `AuthenticationExhausted`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthError::BrowserAuthRequired { .. }
                | AuthError::OAuthCallbackError { .. }
                | AuthError::AuthTimeout { .. }
                | AuthError::Cancelled
                | AuthError::InvalidServiceKey { .. }
        )
    }
}

/// Errors raised by session and service-key stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
