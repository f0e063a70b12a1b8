use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Broker
    pub token_requests: IntCounterVec,
    pub token_resolutions: IntCounterVec,
    pub token_resolution_failures: IntCounterVec,
    pub token_resolution_duration: HistogramVec,

    // Validator
    pub token_validations: IntCounterVec,

    // Browser flow
    pub browser_flows: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("authbroker".into()), None).expect("metrics registry");

        let metrics: Arc<Metrics> = Arc::new(Self {
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token requests by operation"), &["operation"]).expect("metric"),
            token_resolutions: IntCounterVec::new(Opts::new("token_resolutions_total", "Tokens resolved by source"), &["source"]).expect("metric"),
            token_resolution_failures: IntCounterVec::new(Opts::new("token_resolution_failures_total", "Failed resolutions by error kind"), &["reason"]).expect("metric"),
            token_resolution_duration: HistogramVec::new(HistogramOpts::new("token_resolution_duration_seconds", "Resolution duration seconds").buckets(vec![0.005, 0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 300.0]), &["operation"]).expect("metric"),

            token_validations: IntCounterVec::new(Opts::new("token_validations_total", "Validator probe outcomes"), &["result"]).expect("metric"),

            browser_flows: IntCounterVec::new(Opts::new("browser_flows_total", "Interactive login outcomes"), &["outcome"]).expect("metric"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone())).expect("register");
        reg.register(Box::new(metrics.token_resolutions.clone())).expect("register");
        reg.register(Box::new(metrics.token_resolution_failures.clone())).expect("register");
        reg.register(Box::new(metrics.token_resolution_duration.clone())).expect("register");
        reg.register(Box::new(metrics.token_validations.clone())).expect("register");
        reg.register(Box::new(metrics.browser_flows.clone())).expect("register");

        metrics
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn render_lists_namespaced_counters() {
        let metrics = get_metrics().await;
        metrics.token_requests.with_label_values(&["get"]).inc();
        let text = metrics.render().unwrap();
        assert!(text.contains("authbroker_token_requests_total"));
    }
}
