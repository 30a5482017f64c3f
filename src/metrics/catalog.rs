//! The fixed metric set recorded by the host application.
//!
//! Counters end in `_total`, latency histograms are in seconds.

use super::schema::MetricDef;
use crate::config::TelemetryConfig;

/// HTTP requests completed.
///
/// Labels: `method`, `endpoint`, `status`.
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// HTTP request latency in seconds.
///
/// Labels: `method`, `endpoint`.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Errors reported by the host.
///
/// Labels: `error_type`, `endpoint`.
pub const ERRORS_TOTAL: &str = "errors_total";

/// Outbound model calls completed.
///
/// Labels: `provider`, `model_name`.
pub const MODEL_REQUESTS_TOTAL: &str = "model_requests_total";

/// Outbound model call latency in seconds.
///
/// Labels: `provider`, `model_name`.
pub const MODEL_REQUEST_DURATION_SECONDS: &str = "model_request_duration_seconds";

/// Tool calls completed.
///
/// Labels: `provider`, `tool_name`.
pub const TOOL_REQUESTS_TOTAL: &str = "tool_requests_total";

/// Tool call latency in seconds.
///
/// Labels: `provider`, `tool_name`.
pub const TOOL_REQUEST_DURATION_SECONDS: &str = "tool_request_duration_seconds";

/// Last reported number of active WebSocket connections. No labels.
pub const ACTIVE_CONNECTIONS: &str = "active_connections";

/// Chat messages processed.
///
/// Labels: `sender_type` ("user" | "model").
pub const CHAT_MESSAGES_TOTAL: &str = "chat_messages_total";

/// Samples dropped because they did not match their metric's definition.
///
/// Labels: `metric`, `reason`.
pub const INVALID_SAMPLES_TOTAL: &str = "telemetry_invalid_samples_total";

pub fn definitions(config: &TelemetryConfig) -> Vec<MetricDef> {
    vec![
        MetricDef::counter(
            HTTP_REQUESTS_TOTAL,
            "Total HTTP requests.",
            &["method", "endpoint", "status"],
        ),
        MetricDef::histogram(
            HTTP_REQUEST_DURATION_SECONDS,
            "HTTP request latency in seconds.",
            &["method", "endpoint"],
            &config.request_buckets,
        ),
        MetricDef::counter(ERRORS_TOTAL, "Total errors.", &["error_type", "endpoint"]),
        MetricDef::counter(
            MODEL_REQUESTS_TOTAL,
            "Total model requests.",
            &["provider", "model_name"],
        ),
        MetricDef::histogram(
            MODEL_REQUEST_DURATION_SECONDS,
            "Model request latency in seconds.",
            &["provider", "model_name"],
            &config.call_buckets,
        ),
        MetricDef::counter(
            TOOL_REQUESTS_TOTAL,
            "Total tool requests.",
            &["provider", "tool_name"],
        ),
        MetricDef::histogram(
            TOOL_REQUEST_DURATION_SECONDS,
            "Tool request latency in seconds.",
            &["provider", "tool_name"],
            &config.call_buckets,
        ),
        MetricDef::gauge(
            ACTIVE_CONNECTIONS,
            "Number of active WebSocket connections.",
            &[],
        ),
        MetricDef::counter(
            CHAT_MESSAGES_TOTAL,
            "Total chat messages processed.",
            &["sender_type"],
        ),
        MetricDef::counter(
            INVALID_SAMPLES_TOTAL,
            "Samples dropped for not matching their metric definition.",
            &["metric", "reason"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;

    #[test]
    fn catalog_builds_a_valid_registry() {
        let config = TelemetryConfig::default();
        let registry = MetricsRegistry::new(definitions(&config), 16).unwrap();
        assert_eq!(registry.definitions().count(), 10);
        assert_eq!(
            registry.definition(HTTP_REQUESTS_TOTAL).unwrap().labels,
            vec!["method", "endpoint", "status"]
        );
    }
}
