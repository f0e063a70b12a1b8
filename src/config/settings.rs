use serde::Deserialize;

use crate::browser::launcher::Browser;
use crate::config::types::SessionKind;
use crate::utils::constants::{
    DEFAULT_BROWSER_AUTH_TIMEOUT_SECS, DEFAULT_PROBE_PATH, DEFAULT_REDIRECT_PORT,
    DEFAULT_TOKEN_EXCHANGE_TIMEOUT_SECS, DEFAULT_VALIDATOR_TIMEOUT_SECS,
};

/// ================================
/// Full broker configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BrokerConfig {
    #[serde(default)]
    pub settings: BrokerSettings,
    #[serde(default)]
    pub stores: StoresConfig,
}

/// ================================
/// Broker-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    #[serde(default)]
    pub session_kind: SessionKind,
    #[serde(default = "default_true")]
    pub allow_browser_auth: bool,
    #[serde(default)]
    pub direct_uaa: DirectUaa,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_token_exchange_timeout")]
    pub token_exchange_timeout_seconds: u64,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            session_kind: SessionKind::default(),
            allow_browser_auth: true,
            direct_uaa: DirectUaa::default(),
            provider: ProviderKind::default(),
            token_exchange_timeout_seconds: DEFAULT_TOKEN_EXCHANGE_TIMEOUT_SECS,
            validator: ValidatorConfig::default(),
            browser: BrowserConfig::default(),
            logging: None,
            metrics: MetricsConfig::default(),
        }
    }
}

/// When the broker posts to `{uaaUrl}/oauth/token` itself.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectUaa {
    /// only when no token provider is injected
    #[default]
    Auto,
    Always,
    Never,
}

impl DirectUaa {
    pub fn enabled(&self, has_provider: bool) -> bool {
        match self {
            DirectUaa::Auto => !has_provider,
            DirectUaa::Always => true,
            DirectUaa::Never => false,
        }
    }
}

/// Token provider wired by `from_config`.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// refresh grant, else interactive login
    #[default]
    Browser,
    ClientCredentials,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidatorConfig {
    #[serde(default = "default_validator_timeout")]
    pub timeout_seconds: u64,
    /// cheap discovery endpoint probed with the bearer token
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_VALIDATOR_TIMEOUT_SECS,
            probe_path: default_probe_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default)]
    pub browser: Browser,
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
    #[serde(default = "default_browser_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::default(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            timeout_seconds: DEFAULT_BROWSER_AUTH_TIMEOUT_SECS,
        }
    }
}

/// ================================
/// Stores
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoresConfig {
    /// directory with `<destination>.json` service keys;
    /// AUTH_BROKER_PATH is searched when unset
    pub service_keys_path: Option<String>,
    /// directory for `<destination>.session.json`
    pub sessions_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub is_enabled: bool,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_true() -> bool {
    true
}

fn default_token_exchange_timeout() -> u64 {
    DEFAULT_TOKEN_EXCHANGE_TIMEOUT_SECS
}

fn default_validator_timeout() -> u64 {
    DEFAULT_VALIDATOR_TIMEOUT_SECS
}

fn default_probe_path() -> String {
    DEFAULT_PROBE_PATH.to_string()
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

fn default_browser_timeout() -> u64 {
    DEFAULT_BROWSER_AUTH_TIMEOUT_SECS
}
