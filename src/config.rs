use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};

pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;
pub const DEFAULT_MAX_SERIES_PER_METRIC: usize = 1024;
pub const DEFAULT_REQUEST_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];
/// Standard client-library histogram bounds, used for model and tool calls.
pub const DEFAULT_CALL_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// What the recording API does with a sample that does not match its
/// metric's declared definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidSamplePolicy {
    /// Discard the sample and bump `telemetry_invalid_samples_total`.
    #[default]
    Drop,
    /// Panic at the call site.
    Panic,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub window_capacity: usize,
    pub request_buckets: Vec<f64>,
    pub call_buckets: Vec<f64>,
    pub max_series_per_metric: usize,
    pub invalid_sample_policy: InvalidSamplePolicy,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            request_buckets: DEFAULT_REQUEST_BUCKETS.to_vec(),
            call_buckets: DEFAULT_CALL_BUCKETS.to_vec(),
            max_series_per_metric: DEFAULT_MAX_SERIES_PER_METRIC,
            invalid_sample_policy: InvalidSamplePolicy::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(TelemetryError::Config(
                "window_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_series_per_metric == 0 {
            return Err(TelemetryError::Config(
                "max_series_per_metric must be at least 1".to_string(),
            ));
        }
        validate_buckets("request_buckets", &self.request_buckets)?;
        validate_buckets("call_buckets", &self.call_buckets)?;
        Ok(())
    }
}

pub(crate) fn validate_buckets(field: &str, buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(TelemetryError::Config(format!("{field} must not be empty")));
    }
    if buckets.iter().any(|bound| !bound.is_finite()) {
        return Err(TelemetryError::Config(format!(
            "{field} must contain finite bounds only"
        )));
    }
    if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(TelemetryError::Config(format!(
            "{field} must be strictly ascending"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = TelemetryConfig::from_toml_str("").unwrap();
        assert_eq!(config.window_capacity, 1000);
        assert_eq!(config.request_buckets.len(), 11);
        assert_eq!(config.call_buckets.len(), 14);
        assert_eq!(config.call_buckets, DEFAULT_CALL_BUCKETS.to_vec());
        assert_eq!(config.invalid_sample_policy, InvalidSamplePolicy::Drop);
    }

    #[test]
    fn parses_overrides() {
        let config = TelemetryConfig::from_toml_str(
            r#"
window_capacity = 50
request_buckets = [0.1, 1.0]
invalid_sample_policy = "panic"
"#,
        )
        .unwrap();
        assert_eq!(config.window_capacity, 50);
        assert_eq!(config.request_buckets, vec![0.1, 1.0]);
        assert_eq!(config.call_buckets.len(), 14);
        assert_eq!(config.invalid_sample_policy, InvalidSamplePolicy::Panic);
    }

    #[test]
    fn rejects_zero_capacity_and_unsorted_buckets() {
        assert!(matches!(
            TelemetryConfig::from_toml_str("window_capacity = 0"),
            Err(TelemetryError::Config(_))
        ));
        assert!(matches!(
            TelemetryConfig::from_toml_str("call_buckets = [1.0, 0.5]"),
            Err(TelemetryError::Config(_))
        ));
        assert!(matches!(
            TelemetryConfig::from_toml_str("request_buckets = []"),
            Err(TelemetryError::Config(_))
        ));
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        assert!(matches!(
            TelemetryConfig::from_toml_str("invalid_sample_policy = \"ignore\""),
            Err(TelemetryError::Toml(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.toml");
        std::fs::write(&path, "window_capacity = 7\n").unwrap();
        let config = TelemetryConfig::load(&path).unwrap();
        assert_eq!(config.window_capacity, 7);
    }
}
