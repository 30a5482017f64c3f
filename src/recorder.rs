//! The write path.
//!
//! Every call is synchronous, in-memory and infallible from the caller's
//! point of view. A `begin_*` whose matching `end_*` never arrives leaves its
//! entry in the in-flight registry for the rest of the process; the
//! `in_flight_*` counters expose how many are outstanding.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::clock::Clock;
use crate::config::InvalidSamplePolicy;
use crate::error::Result;
use crate::metrics::MetricsRegistry;
use crate::metrics::catalog::{
    ACTIVE_CONNECTIONS, CHAT_MESSAGES_TOTAL, ERRORS_TOTAL, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUESTS_TOTAL, INVALID_SAMPLES_TOTAL, MODEL_REQUEST_DURATION_SECONDS,
    MODEL_REQUESTS_TOTAL, TOOL_REQUEST_DURATION_SECONDS, TOOL_REQUESTS_TOTAL,
};
use crate::window::{LatencyWindows, aggregation_key};

/// Start timestamps keyed by caller-supplied id. Sharded, so begin/end for
/// different ids rarely touch the same lock.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    started: DashMap<String, Instant>,
}

impl InFlightRegistry {
    pub fn begin(&self, id: &str, now: Instant) {
        if self.started.insert(id.to_string(), now).is_some() {
            tracing::debug!(id, "in-flight id reused; restarting its timer");
        }
    }

    /// Removes the entry and returns its start time.
    pub fn end(&self, id: &str) -> Option<Instant> {
        self.started.remove(id).map(|(_, started)| started)
    }

    pub fn len(&self) -> usize {
        self.started.len()
    }

    pub fn is_empty(&self) -> bool {
        self.started.is_empty()
    }
}

pub struct Recorder {
    registry: Arc<MetricsRegistry>,
    windows: Arc<LatencyWindows>,
    clock: Arc<dyn Clock>,
    policy: InvalidSamplePolicy,
    requests: InFlightRegistry,
    model_calls: InFlightRegistry,
    tool_calls: InFlightRegistry,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("policy", &self.policy)
            .field("in_flight_requests", &self.requests.len())
            .field("in_flight_model_calls", &self.model_calls.len())
            .field("in_flight_tool_calls", &self.tool_calls.len())
            .finish()
    }
}

impl Recorder {
    pub fn new(
        registry: Arc<MetricsRegistry>,
        windows: Arc<LatencyWindows>,
        clock: Arc<dyn Clock>,
        policy: InvalidSamplePolicy,
    ) -> Self {
        Self {
            registry,
            windows,
            clock,
            policy,
            requests: InFlightRegistry::default(),
            model_calls: InFlightRegistry::default(),
            tool_calls: InFlightRegistry::default(),
        }
    }

    pub fn begin_request(&self, id: &str) {
        self.requests.begin(id, self.clock.now());
    }

    /// Records a completed request. Unknown ids are ignored and return `None`.
    pub fn end_request(
        &self,
        id: &str,
        method: &str,
        endpoint: &str,
        status_code: u16,
    ) -> Option<Duration> {
        let Some(started) = self.requests.end(id) else {
            tracing::debug!(id, method, endpoint, "end_request without matching begin");
            return None;
        };
        let duration = self.clock.now().saturating_duration_since(started);
        let seconds = duration.as_secs_f64();
        let status = status_code.to_string();

        self.apply(self.registry.increment(
            HTTP_REQUESTS_TOTAL,
            &[
                ("method", method),
                ("endpoint", endpoint),
                ("status", status.as_str()),
            ],
            1,
        ));
        self.apply(self.registry.observe(
            HTTP_REQUEST_DURATION_SECONDS,
            &[("method", method), ("endpoint", endpoint)],
            seconds,
        ));
        self.windows
            .requests
            .append(&aggregation_key(method, endpoint), seconds);
        Some(duration)
    }

    pub fn begin_model_call(&self, id: &str) {
        self.model_calls.begin(id, self.clock.now());
    }

    pub fn end_model_call(&self, id: &str, provider: &str, model: &str) -> Option<Duration> {
        let Some(started) = self.model_calls.end(id) else {
            tracing::debug!(id, provider, model, "end_model_call without matching begin");
            return None;
        };
        let duration = self.clock.now().saturating_duration_since(started);
        self.record_model_call(provider, model, duration);
        Some(duration)
    }

    pub fn record_model_call(&self, provider: &str, model: &str, duration: Duration) {
        let labels = [("provider", provider), ("model_name", model)];
        let seconds = duration.as_secs_f64();
        self.apply(self.registry.increment(MODEL_REQUESTS_TOTAL, &labels, 1));
        self.apply(
            self.registry
                .observe(MODEL_REQUEST_DURATION_SECONDS, &labels, seconds),
        );
        self.windows
            .model_calls
            .append(&aggregation_key(provider, model), seconds);
    }

    pub fn begin_tool_call(&self, id: &str) {
        self.tool_calls.begin(id, self.clock.now());
    }

    pub fn end_tool_call(&self, id: &str, provider: &str, tool: &str) -> Option<Duration> {
        let Some(started) = self.tool_calls.end(id) else {
            tracing::debug!(id, provider, tool, "end_tool_call without matching begin");
            return None;
        };
        let duration = self.clock.now().saturating_duration_since(started);
        self.record_tool_call(provider, tool, duration);
        Some(duration)
    }

    pub fn record_tool_call(&self, provider: &str, tool: &str, duration: Duration) {
        let labels = [("provider", provider), ("tool_name", tool)];
        let seconds = duration.as_secs_f64();
        self.apply(self.registry.increment(TOOL_REQUESTS_TOTAL, &labels, 1));
        self.apply(
            self.registry
                .observe(TOOL_REQUEST_DURATION_SECONDS, &labels, seconds),
        );
        self.windows
            .tool_calls
            .append(&aggregation_key(provider, tool), seconds);
    }

    pub fn set_active_connections(&self, count: u64) {
        self.apply(self.registry.set(ACTIVE_CONNECTIONS, &[], count as f64));
    }

    pub fn record_chat_message(&self, sender_type: &str) {
        self.apply(
            self.registry
                .increment(CHAT_MESSAGES_TOTAL, &[("sender_type", sender_type)], 1),
        );
    }

    pub fn record_error(&self, error_type: &str, endpoint: &str) {
        self.apply(self.registry.increment(
            ERRORS_TOTAL,
            &[("error_type", error_type), ("endpoint", endpoint)],
            1,
        ));
    }

    /// Increments any declared counter, applying the invalid-sample policy.
    pub fn increment(&self, metric: &str, labels: &[(&str, &str)], amount: u64) {
        self.apply(self.registry.increment(metric, labels, amount));
    }

    /// Observes into any declared histogram, applying the invalid-sample policy.
    pub fn observe(&self, metric: &str, labels: &[(&str, &str)], value: f64) {
        self.apply(self.registry.observe(metric, labels, value));
    }

    /// Sets any declared gauge, applying the invalid-sample policy.
    pub fn set(&self, metric: &str, labels: &[(&str, &str)], value: f64) {
        self.apply(self.registry.set(metric, labels, value));
    }

    pub fn in_flight_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn in_flight_calls(&self) -> usize {
        self.model_calls.len() + self.tool_calls.len()
    }

    fn apply(&self, outcome: Result<()>) {
        let Err(err) = outcome else {
            return;
        };
        match self.policy {
            InvalidSamplePolicy::Panic => panic!("invalid telemetry sample: {err}"),
            InvalidSamplePolicy::Drop => {
                let metric = err.metric().unwrap_or("unknown");
                tracing::warn!(metric, error = %err, "dropping invalid telemetry sample");
                let counted = self.registry.increment(
                    INVALID_SAMPLES_TOTAL,
                    &[("metric", metric), ("reason", err.reason())],
                    1,
                );
                if let Err(err) = counted {
                    tracing::error!(error = %err, "invalid-sample counter is not declared");
                }
            }
        }
    }
}
