use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// ================================
/// Credentials used to obtain tokens
/// ================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationConfig {
    pub uaa_url: String,
    pub uaa_client_id: String,
    pub uaa_client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AuthorizationConfig {
    pub fn new(
        uaa_url: impl Into<String>,
        uaa_client_id: impl Into<String>,
        uaa_client_secret: impl Into<String>,
    ) -> Self {
        Self {
            uaa_url: uaa_url.into(),
            uaa_client_id: uaa_client_id.into(),
            uaa_client_secret: uaa_client_secret.into(),
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    /// Non-empty refresh token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_uaa_credentials(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.uaa_url.trim().is_empty() {
            missing.push("uaaUrl");
        }
        if self.uaa_client_id.trim().is_empty() {
            missing.push("uaaClientId");
        }
        if self.uaa_client_secret.trim().is_empty() {
            missing.push("uaaClientSecret");
        }
        missing
    }

    /// All three UAA fields must be present before a provider is called.
    pub fn ensure_complete(&self, destination: &str) -> Result<(), AuthError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthError::InvalidServiceKey {
                destination: destination.to_owned(),
                missing,
            })
        }
    }
}

/// ================================
/// Values needed to use a token
/// ================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default)]
    pub authorization_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sap_client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ConnectionConfig {
    pub fn new(service_url: Option<String>, authorization_token: impl Into<String>) -> Self {
        Self {
            service_url,
            authorization_token: authorization_token.into(),
            sap_client: None,
            language: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        Some(self.authorization_token.as_str()).filter(|t| !t.trim().is_empty())
    }

    pub fn service_url(&self) -> Option<&str> {
        self.service_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Output of a token provider, persisted back into the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenProviderResult {
    pub connection_config: ConnectionConfig,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Session shape of a destination. Chosen once when the broker is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Abap,
    Btp,
    Xsuaa,
}

impl SessionKind {
    /// XSUAA credentials do not encode a service URL.
    pub fn requires_service_url(&self) -> bool {
        match self {
            SessionKind::Abap | SessionKind::Btp => true,
            SessionKind::Xsuaa => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Abap => "abap",
            SessionKind::Btp => "btp",
            SessionKind::Xsuaa => "xsuaa",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_reported_by_name() {
        let auth = AuthorizationConfig::new("https://uaa.x", "", " ");
        assert_eq!(auth.missing_fields(), vec!["uaaClientId", "uaaClientSecret"]);
        assert!(!auth.has_uaa_credentials());

        let err = auth.ensure_complete("T").unwrap_err();
        assert_eq!(err.kind(), "InvalidServiceKey");
        assert!(err.to_string().contains("uaaClientId, uaaClientSecret"));
    }

    #[test]
    fn empty_refresh_token_counts_as_absent() {
        let auth = AuthorizationConfig::new("u", "c", "s").with_refresh_token(Some(String::new()));
        assert_eq!(auth.refresh_token(), None);
    }

    #[test]
    fn connection_config_serializes_camel_case() {
        let cfg = ConnectionConfig::new(Some("https://sap.x".into()), "tok");
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["serviceUrl"], "https://sap.x");
        assert_eq!(json["authorizationToken"], "tok");
        assert!(json.get("sapClient").is_none());
    }

    #[test]
    fn only_xsuaa_allows_missing_service_url() {
        assert!(SessionKind::Abap.requires_service_url());
        assert!(SessionKind::Btp.requires_service_url());
        assert!(!SessionKind::Xsuaa.requires_service_url());
    }
}
