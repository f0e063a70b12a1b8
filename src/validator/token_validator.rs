use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

use crate::config::settings::ValidatorConfig;
use crate::error::AuthError;
use crate::observability::metrics::get_metrics;

// the principal authenticated but lacks authorization for the probe
static PERMISSION_DENIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(no|missing)\s+authori[sz]ation\b").expect("permission-denied signature")
});

/// Token check used by the broker.
#[async_trait]
pub trait ValidateToken: Send + Sync {
    /// false only when the destination positively rejected the token
    async fn validate(&self, token: &str, service_url: &str) -> bool;
}

/// Outcome of one probe, before collapsing to a bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// authenticated, missing authorization
    PermissionDenied,
    Invalid,
    /// unexpected status or network trouble; fails open
    Inconclusive,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Validation::Invalid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Validation::Valid => "valid",
            Validation::PermissionDenied => "permission_denied",
            Validation::Invalid => "invalid",
            Validation::Inconclusive => "inconclusive",
        }
    }
}

/// Classifies a probe response.
pub fn classify(status: StatusCode, body: &str) -> Validation {
    if status.is_success() {
        return Validation::Valid;
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        if PERMISSION_DENIED.is_match(body) {
            return Validation::PermissionDenied;
        }
        return Validation::Invalid;
    }
    Validation::Inconclusive
}

/// Probes `GET {service_url}{probe_path}` with the bearer token.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    client: Client,
    probe_path: String,
    timeout: Duration,
}

impl TokenValidator {
    pub fn new(config: &ValidatorConfig) -> Result<Self, AuthError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build validator HTTP client: {}", e)))?;
        Ok(Self {
            client,
            probe_path: config.probe_path.clone(),
            timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn probe_url(&self, service_url: &str) -> String {
        format!("{}{}", service_url.trim_end_matches('/'), self.probe_path)
    }

    pub async fn probe(&self, token: &str, service_url: &str) -> Validation {
        let url = self.probe_url(service_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/xml")
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %url, error = %e, "validation probe failed, keeping token");
                return Validation::Inconclusive;
            }
        };

        let status = response.status();
        // body only matters for the permission-denied signature
        let body = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            response.text().await.unwrap_or_default()
        } else {
            String::new()
        };

        let validation = classify(status, &body);
        match validation {
            Validation::Inconclusive => {
                warn!(url = %url, status = status.as_u16(), "unexpected probe status, keeping token")
            }
            _ => debug!(url = %url, status = status.as_u16(), result = validation.as_str(), "token probed"),
        }
        validation
    }
}

#[async_trait]
impl ValidateToken for TokenValidator {
    async fn validate(&self, token: &str, service_url: &str) -> bool {
        let validation = self.probe(token, service_url).await;
        get_metrics()
            .await
            .token_validations
            .with_label_values(&[validation.as_str()])
            .inc();
        validation.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    const PROBE: &str = "/sap/bc/adt/discovery";

    fn validator() -> TokenValidator {
        TokenValidator::new(&ValidatorConfig::default()).unwrap()
    }

    #[test]
    fn classification_rules() {
        assert_eq!(classify(StatusCode::OK, ""), Validation::Valid);
        assert_eq!(classify(StatusCode::UNAUTHORIZED, "Unauthorized"), Validation::Invalid);
        assert_eq!(classify(StatusCode::FORBIDDEN, "No authorization for object S_ADT_RES"), Validation::PermissionDenied);
        assert_eq!(classify(StatusCode::UNAUTHORIZED, "missing  Authorisation"), Validation::PermissionDenied);
        assert_eq!(classify(StatusCode::SERVICE_UNAVAILABLE, ""), Validation::Inconclusive);
        assert_eq!(classify(StatusCode::NOT_FOUND, ""), Validation::Inconclusive);
    }

    #[tokio::test]
    async fn success_sends_bearer_and_accept() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(PROBE)
                    .header("authorization", "Bearer t1")
                    .header("accept", "application/xml");
                then.status(200).body("<app:service/>");
            })
            .await;

        assert!(validator().validate("t1", &server.base_url()).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unavailable_fails_open() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PROBE);
                then.status(503);
            })
            .await;

        assert!(validator().validate("t1", &server.base_url()).await);
    }

    #[tokio::test]
    async fn generic_unauthorized_is_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PROBE);
                then.status(401).body("Logon failed");
            })
            .await;

        assert!(!validator().validate("t1", &server.base_url()).await);
    }

    #[tokio::test]
    async fn forbidden_without_authorization_is_valid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PROBE);
                then.status(403).body("No authorization to access ADT discovery");
            })
            .await;

        assert!(validator().validate("t1", &server.base_url()).await);
    }

    #[tokio::test]
    async fn probe_timeout_fails_open() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PROBE);
                then.status(401).delay(Duration::from_millis(500));
            })
            .await;

        let validator = validator().with_timeout(Duration::from_millis(50));
        assert_eq!(validator.probe("t1", &server.base_url()).await, Validation::Inconclusive);
    }

    #[tokio::test]
    async fn unreachable_host_fails_open() {
        assert!(validator().validate("t1", "http://127.0.0.1:9").await);
    }
}
