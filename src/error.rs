use thiserror::Error;

use crate::metrics::MetricKind;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid metric definition `{metric}`: {reason}")]
    InvalidDefinition { metric: String, reason: String },
    #[error("unknown metric: {metric}")]
    UnknownMetric { metric: String },
    #[error("metric `{metric}` is a {actual}, not a {expected}")]
    KindMismatch {
        metric: String,
        expected: MetricKind,
        actual: MetricKind,
    },
    #[error("label mismatch for `{metric}`: expected [{}], got [{}]", .expected.join(","), .actual.join(","))]
    LabelMismatch {
        metric: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to format timestamp: {0}")]
    Timestamp(String),
}

impl TelemetryError {
    /// Metric the error refers to, if any.
    pub fn metric(&self) -> Option<&str> {
        match self {
            Self::InvalidDefinition { metric, .. }
            | Self::UnknownMetric { metric }
            | Self::KindMismatch { metric, .. }
            | Self::LabelMismatch { metric, .. } => Some(metric.as_str()),
            _ => None,
        }
    }

    /// Short machine-readable tag, used as the `reason` label when an invalid
    /// sample is dropped.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidDefinition { .. } => "invalid_definition",
            Self::UnknownMetric { .. } => "unknown_metric",
            Self::KindMismatch { .. } => "kind_mismatch",
            Self::LabelMismatch { .. } => "label_mismatch",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Toml(_) => "toml",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
