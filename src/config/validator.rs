//! Configuration validation with aggregated errors.

use tracing::error;

use crate::config::settings::{BrokerConfig, BrokerSettings, StoresConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Returns Ok(()) or every issue found.
pub fn validate_broker_config(cfg: &BrokerConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_stores(&cfg.stores, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            error!("config: {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &BrokerSettings, errors: &mut Vec<String>) {
    if settings.token_exchange_timeout_seconds == 0 {
        errors.push("settings.token_exchange_timeout_seconds must be greater than 0".to_string());
    }

    let validator = &settings.validator;
    if validator.timeout_seconds == 0 {
        errors.push("settings.validator.timeout_seconds must be greater than 0".to_string());
    }
    if !validator.probe_path.starts_with('/') {
        errors.push(format!(
            "settings.validator.probe_path '{}' must start with '/'",
            validator.probe_path
        ));
    }

    if settings.browser.timeout_seconds < 1 {
        errors.push("settings.browser.timeout_seconds must be at least 1".to_string());
    }

    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {}",
                logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
    }
}

fn validate_stores(stores: &StoresConfig, errors: &mut Vec<String>) {
    for (name, value) in [
        ("stores.service_keys_path", &stores.service_keys_path),
        ("stores.sessions_path", &stores.sessions_path),
    ] {
        if value.as_deref().is_some_and(|p| p.trim().is_empty()) {
            errors.push(format!("{} must not be empty when set", name));
        }
    }
}
