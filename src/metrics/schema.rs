use std::fmt;

use serde::Serialize;

use crate::config::validate_buckets;
use crate::error::{Result, TelemetryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric's identity: name, kind and the ordered label names every sample
/// must supply. Fixed once the registry is built.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricDef {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub labels: Vec<String>,
    /// Upper bucket bounds in seconds; histograms only.
    pub buckets: Vec<f64>,
}

impl MetricDef {
    pub fn counter(name: &str, help: &str, labels: &[&str]) -> Self {
        Self::new(name, help, MetricKind::Counter, labels, Vec::new())
    }

    pub fn gauge(name: &str, help: &str, labels: &[&str]) -> Self {
        Self::new(name, help, MetricKind::Gauge, labels, Vec::new())
    }

    pub fn histogram(name: &str, help: &str, labels: &[&str], buckets: &[f64]) -> Self {
        Self::new(name, help, MetricKind::Histogram, labels, buckets.to_vec())
    }

    fn new(
        name: &str,
        help: &str,
        kind: MetricKind,
        labels: &[&str],
        buckets: Vec<f64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            labels: labels.iter().map(|label| label.to_string()).collect(),
            buckets,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_metric_name(&self.name) {
            return Err(self.invalid("metric name must match [a-zA-Z_:][a-zA-Z0-9_:]*"));
        }
        for (idx, label) in self.labels.iter().enumerate() {
            if !is_valid_label_name(label) {
                return Err(self.invalid(&format!("invalid label name `{label}`")));
            }
            if self.labels[..idx].contains(label) {
                return Err(self.invalid(&format!("duplicate label name `{label}`")));
            }
            if self.kind == MetricKind::Histogram && label == "le" {
                return Err(self.invalid("`le` is reserved for histogram buckets"));
            }
        }
        match self.kind {
            MetricKind::Histogram => validate_buckets("buckets", &self.buckets)
                .map_err(|err| self.invalid(&err.to_string())),
            MetricKind::Counter | MetricKind::Gauge if !self.buckets.is_empty() => {
                Err(self.invalid("only histograms take buckets"))
            }
            MetricKind::Counter | MetricKind::Gauge => Ok(()),
        }
    }

    /// Checks that `labels` names exactly the declared labels in declared
    /// order and returns their values.
    pub(crate) fn label_values(&self, labels: &[(&str, &str)]) -> Result<Vec<String>> {
        let matches = labels.len() == self.labels.len()
            && labels
                .iter()
                .zip(&self.labels)
                .all(|((name, _), declared)| *name == declared.as_str());
        if !matches {
            return Err(TelemetryError::LabelMismatch {
                metric: self.name.clone(),
                expected: self.labels.clone(),
                actual: labels.iter().map(|(name, _)| name.to_string()).collect(),
            });
        }
        Ok(labels.iter().map(|(_, value)| value.to_string()).collect())
    }

    fn invalid(&self, reason: &str) -> TelemetryError {
        TelemetryError::InvalidDefinition {
            metric: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
