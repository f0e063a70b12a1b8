use std::path::Path;
use std::sync::LazyLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error, info};

use crate::config::settings::{BrokerConfig, LoggingConfig};
use crate::config::validator::validate_broker_config;
use crate::utils::constants::DEFAULT_CONFIG_FILE;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("env placeholder pattern"));

/// Loads the broker config.
///
/// An explicit path must exist. Without one, `auth-broker.yaml` in the
/// working directory is used when present, defaults otherwise.
pub async fn run(config_path: Option<&str>) -> Result<BrokerConfig> {
    match config_path {
        Some(path) => file_to_config(Path::new(path)).await,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => file_to_config(Path::new(DEFAULT_CONFIG_FILE)).await,
        None => {
            info!("no config file, using defaults");
            finalize(BrokerConfig::default())
        }
    }
}

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<BrokerConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<BrokerConfig> {
    let expanded = expand_env_vars(content);
    // an empty document is a valid, all-defaults config
    if expanded.trim().is_empty() {
        return finalize(BrokerConfig::default());
    }
    let config: BrokerConfig = serde_yaml::from_str(&expanded)
        .inspect_err(|e| error!("parse config error: {}", e))
        .context("invalid config format")?;
    finalize(config)
}

fn finalize(mut config: BrokerConfig) -> Result<BrokerConfig> {
    if config.settings.logging.is_none() {
        config.settings.logging = Some(LoggingConfig::default());
    }
    debug!("validating config ...");
    validate_broker_config(&config).map_err(|errors| anyhow!("config is not valid:\n  - {}", errors.join("\n  - ")))?;
    Ok(config)
}

/// Replaces `${VAR}` and `${VAR:default}` with the environment value.
pub fn expand_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::launcher::Browser;
    use crate::config::settings::{DirectUaa, LogFormat};
    use crate::config::types::SessionKind;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn expands_env_with_defaults() {
        std::env::set_var("AUTH_BROKER_TEST_PORT", "4010");
        let out = expand_env_vars("port: ${AUTH_BROKER_TEST_PORT:3001}\nkind: ${AUTH_BROKER_TEST_UNSET:btp}");
        std::env::remove_var("AUTH_BROKER_TEST_PORT");
        assert_eq!(out, "port: 4010\nkind: btp");
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
settings:
  session_kind: xsuaa
  allow_browser_auth: false
  direct_uaa: always
  validator:
    timeout_seconds: 5
  browser:
    browser: headless
    redirect_port: 4000
  logging: { level: debug, format: json }
stores:
  sessions_path: /tmp/sessions
"#;
        let cfg = parse_config(yaml).unwrap();
        assert_eq!(cfg.settings.session_kind, SessionKind::Xsuaa);
        assert!(!cfg.settings.allow_browser_auth);
        assert_eq!(cfg.settings.direct_uaa, DirectUaa::Always);
        assert_eq!(cfg.settings.validator.timeout_seconds, 5);
        assert_eq!(cfg.settings.validator.probe_path, "/sap/bc/adt/discovery");
        assert_eq!(cfg.settings.browser.browser, Browser::None);
        assert_eq!(cfg.settings.browser.redirect_port, 4000);
        assert_eq!(cfg.settings.logging.unwrap().format, LogFormat::Json);
        assert_eq!(cfg.stores.sessions_path.as_deref(), Some("/tmp/sessions"));
    }

    #[test]
    fn empty_document_takes_defaults() {
        let cfg = parse_config("").unwrap();
        assert!(cfg.settings.allow_browser_auth);
        assert_eq!(cfg.settings.logging.unwrap().level, "info");
    }

    #[test]
    fn invalid_values_are_reported_together() {
        let err = parse_config("settings:\n  validator:\n    timeout_seconds: 0\n    probe_path: nope\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("config is not valid"));
        assert!(msg.contains("timeout_seconds"));
        assert!(msg.contains("probe_path"));
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "settings:\n  token_exchange_timeout_seconds: 12").unwrap();
        let cfg = file_to_config(file.path()).await.unwrap();
        assert_eq!(cfg.settings.token_exchange_timeout_seconds, 12);
    }

    #[tokio::test]
    async fn explicit_missing_file_fails() {
        assert!(run(Some("/nonexistent/auth-broker.yaml")).await.is_err());
    }
}
