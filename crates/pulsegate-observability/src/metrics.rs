//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for PulseGate:
//! - Request counts and latency by endpoint and outcome
//! - Authentication attempts
//! - Days walked and per-metric failures during range syncs

use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector for PulseGate
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Requests handled, by endpoint and outcome (`success`/`failure`)
    pub http_requests_total: CounterVec,
    /// End-to-end handler duration
    pub http_request_duration_seconds: HistogramVec,

    /// Authentication attempts by outcome
    pub auth_attempts_total: CounterVec,

    /// Calendar days collected by sync-all
    pub sync_days_total: Counter,
    /// Metrics that failed for a day during sync-all
    pub sync_metric_failures_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new(
                "pulsegate_http_requests_total",
                "Total number of handled requests",
            ),
            &["endpoint", "outcome"],
        )?;

        // Range syncs make many sequential upstream calls, hence the long tail
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pulsegate_http_request_duration_seconds",
                "Request handling duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["endpoint"],
        )?;

        let auth_attempts_total = CounterVec::new(
            Opts::new(
                "pulsegate_auth_attempts_total",
                "Total number of upstream authentication attempts",
            ),
            &["outcome"],
        )?;

        let sync_days_total = Counter::new(
            "pulsegate_sync_days_total",
            "Total number of calendar days collected by sync-all",
        )?;

        let sync_metric_failures_total = CounterVec::new(
            Opts::new(
                "pulsegate_sync_metric_failures_total",
                "Per-day metric failures recorded by sync-all",
            ),
            &["metric"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(auth_attempts_total.clone()))?;
        registry.register(Box::new(sync_days_total.clone()))?;
        registry.register(Box::new(sync_metric_failures_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            http_requests_total,
            http_request_duration_seconds,
            auth_attempts_total,
            sync_days_total,
            sync_metric_failures_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a handled request
    pub fn record_request(&self, endpoint: &str, success: bool, duration_secs: f64) {
        self.http_requests_total
            .with_label_values(&[endpoint, outcome(success)])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    /// Record an authentication attempt
    pub fn record_auth_attempt(&self, success: bool) {
        self.auth_attempts_total
            .with_label_values(&[outcome(success)])
            .inc();
    }

    /// Record one synced day and the metrics that failed for it
    pub fn record_sync_day(&self, failed_metrics: &[&str]) {
        self.sync_days_total.inc();
        for metric in failed_metrics {
            self.sync_metric_failures_total
                .with_label_values(&[*metric])
                .inc();
        }
    }

    /// Render every registered metric in the text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

fn outcome(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        // Plain counters are exported before their first increment
        assert!(metrics.render().unwrap().contains("pulsegate_sync_days_total 0"));
    }

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("/sleep", true, 0.4);
        metrics.record_request("/sleep", false, 1.2);
        metrics.record_request("/sleep", true, 0.3);

        let text = metrics.render().unwrap();
        assert!(
            text.contains(r#"pulsegate_http_requests_total{endpoint="/sleep",outcome="success"} 2"#)
        );
        assert!(
            text.contains(r#"pulsegate_http_requests_total{endpoint="/sleep",outcome="failure"} 1"#)
        );
        assert!(text.contains(r#"pulsegate_http_request_duration_seconds_count{endpoint="/sleep"} 3"#));
    }

    #[test]
    fn test_record_auth_attempt() {
        let metrics = Metrics::new().unwrap();
        metrics.record_auth_attempt(false);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"pulsegate_auth_attempts_total{outcome="failure"} 1"#));
    }

    #[test]
    fn test_record_sync_day() {
        let metrics = Metrics::new().unwrap();
        metrics.record_sync_day(&["stress", "bodyBattery"]);
        metrics.record_sync_day(&["stress"]);
        metrics.record_sync_day(&[]);

        let text = metrics.render().unwrap();
        assert!(text.contains("pulsegate_sync_days_total 3"));
        assert!(text.contains(r#"pulsegate_sync_metric_failures_total{metric="stress"} 2"#));
        assert!(text.contains(r#"pulsegate_sync_metric_failures_total{metric="bodyBattery"} 1"#));
    }

    #[test]
    fn test_metrics_default() {
        let metrics = Metrics::default();
        assert!(metrics.render().is_ok());
    }
}
