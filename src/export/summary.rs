use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::{DurationsMs, WindowStats, pooled_mean, seconds_to_rounded_millis};
use crate::error::Result;
use crate::window::LatencyWindows;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EndpointStats {
    pub method: String,
    pub endpoint: String,
    pub request_count: usize,
    #[serde(flatten)]
    pub durations: DurationsMs,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallStats {
    pub provider: String,
    pub name: String,
    pub call_count: usize,
    #[serde(flatten)]
    pub durations: DurationsMs,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub timestamp: String,
    pub total_requests: usize,
    pub avg_latency_ms: f64,
    pub active_connections: u64,
    pub endpoints: BTreeMap<String, EndpointStats>,
    pub model_calls: BTreeMap<String, CallStats>,
    pub tool_calls: BTreeMap<String, CallStats>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EndpointsReport {
    pub timestamp: String,
    pub endpoints: BTreeMap<String, EndpointStats>,
}

impl MetricsSummary {
    /// `total_requests` and `avg_latency_ms` pool every request sample, so a
    /// busy endpoint weighs more than a quiet one.
    pub(crate) fn build(
        windows: &LatencyWindows,
        active_connections: u64,
        timestamp: String,
    ) -> Result<Self> {
        let requests = windows.requests.snapshot();
        let (total_requests, avg_latency_ms) =
            match pooled_mean(requests.values().map(Vec::as_slice)) {
                Some((count, mean)) => (count, seconds_to_rounded_millis(mean)),
                None => (0, 0.0),
            };

        Ok(Self {
            timestamp,
            total_requests,
            avg_latency_ms,
            active_connections,
            endpoints: endpoint_stats(&requests),
            model_calls: call_stats(&windows.model_calls.snapshot()),
            tool_calls: call_stats(&windows.tool_calls.snapshot()),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub(crate) fn endpoint_stats(
    windows: &BTreeMap<String, Vec<f64>>,
) -> BTreeMap<String, EndpointStats> {
    windows
        .iter()
        .filter_map(|(key, samples)| {
            let stats = WindowStats::compute(samples)?;
            let (method, endpoint) = split_key(key);
            Some((
                key.clone(),
                EndpointStats {
                    method: method.to_string(),
                    endpoint: endpoint.to_string(),
                    request_count: stats.count,
                    durations: stats.to_millis(),
                },
            ))
        })
        .collect()
}

fn call_stats(windows: &BTreeMap<String, Vec<f64>>) -> BTreeMap<String, CallStats> {
    windows
        .iter()
        .filter_map(|(key, samples)| {
            let stats = WindowStats::compute(samples)?;
            let (provider, name) = split_key(key);
            Some((
                key.clone(),
                CallStats {
                    provider: provider.to_string(),
                    name: name.to_string(),
                    call_count: stats.count,
                    durations: stats.to_millis(),
                },
            ))
        })
        .collect()
}

/// Splits on the first `:`; the second half may itself contain colons.
fn split_key(key: &str) -> (&str, &str) {
    key.split_once(':').unwrap_or((key, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_average_pools_raw_samples() {
        let windows = LatencyWindows::new(1000);
        for _ in 0..9 {
            windows.requests.append("GET:/fast", 0.010);
        }
        windows.requests.append("POST:/slow", 1.0);

        let summary = MetricsSummary::build(&windows, 2, "t".to_string()).unwrap();
        assert_eq!(summary.total_requests, 10);
        // (9 * 10ms + 1000ms) / 10; the per-endpoint mean of means is 505ms.
        assert_eq!(summary.avg_latency_ms, 109.0);
        assert_eq!(summary.active_connections, 2);

        let fast = &summary.endpoints["GET:/fast"];
        assert_eq!(fast.method, "GET");
        assert_eq!(fast.endpoint, "/fast");
        assert_eq!(fast.request_count, 9);
        assert_eq!(fast.durations.p95_duration_ms, 10.0);
    }

    #[test]
    fn empty_windows_yield_zeroes() {
        let windows = LatencyWindows::new(10);
        let summary = MetricsSummary::build(&windows, 0, "t".to_string()).unwrap();
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.avg_latency_ms, 0.0);
        assert!(summary.endpoints.is_empty());
    }

    #[test]
    fn json_shape_matches_dashboard_contract() {
        let windows = LatencyWindows::new(10);
        windows.requests.append("GET:/api/list_models", 0.25);
        windows.model_calls.append("ollama:llama3:8b", 0.5);

        let summary = MetricsSummary::build(&windows, 1, "2026-01-01T00:00:00Z".to_string())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();

        assert_eq!(value["timestamp"], "2026-01-01T00:00:00Z");
        assert_eq!(value["total_requests"], 1);
        assert_eq!(value["avg_latency_ms"], 250.0);
        let endpoint = &value["endpoints"]["GET:/api/list_models"];
        assert_eq!(endpoint["method"], "GET");
        assert_eq!(endpoint["endpoint"], "/api/list_models");
        assert_eq!(endpoint["request_count"], 1);
        for field in [
            "avg_duration_ms",
            "min_duration_ms",
            "max_duration_ms",
            "p95_duration_ms",
        ] {
            assert_eq!(endpoint[field], 250.0, "{field}");
        }
        let model = &value["model_calls"]["ollama:llama3:8b"];
        assert_eq!(model["provider"], "ollama");
        assert_eq!(model["name"], "llama3:8b");
        assert_eq!(model["call_count"], 1);
    }

    #[test]
    fn keys_without_separator_keep_whole_key_as_first_part() {
        assert_eq!(split_key("GET:/a:b"), ("GET", "/a:b"));
        assert_eq!(split_key("bare"), ("bare", ""));
    }
}
