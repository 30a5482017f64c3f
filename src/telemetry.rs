//! The process-wide telemetry context.
//!
//! Build one `Telemetry` during startup, wrap it in an `Arc`, and hand clones
//! to every component that records or exports. There is no global instance
//! and no reset: the metric set is fixed once the context exists, and tests
//! get isolation by constructing their own.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::export::Exporter;
use crate::metrics::{MetricDef, MetricsRegistry, catalog};
use crate::recorder::Recorder;
use crate::window::LatencyWindows;

#[derive(Debug)]
pub struct Telemetry {
    config: TelemetryConfig,
    registry: Arc<MetricsRegistry>,
    windows: Arc<LatencyWindows>,
    recorder: Recorder,
    exporter: Exporter,
}

impl Telemetry {
    pub fn new(config: TelemetryConfig) -> Result<Self> {
        TelemetryBuilder::new(config).build()
    }

    pub fn builder(config: TelemetryConfig) -> TelemetryBuilder {
        TelemetryBuilder::new(config)
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    pub fn windows(&self) -> &LatencyWindows {
        &self.windows
    }
}

pub struct TelemetryBuilder {
    config: TelemetryConfig,
    clock: Arc<dyn Clock>,
    extra_metrics: Vec<MetricDef>,
}

impl TelemetryBuilder {
    fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            extra_metrics: Vec::new(),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Declares an additional metric next to the built-in catalog. Name
    /// collisions with the catalog fail at `build`.
    pub fn metric(mut self, def: MetricDef) -> Self {
        self.extra_metrics.push(def);
        self
    }

    pub fn build(self) -> Result<Telemetry> {
        let Self {
            config,
            clock,
            extra_metrics,
        } = self;
        config.validate()?;

        let mut defs = catalog::definitions(&config);
        defs.extend(extra_metrics);
        let registry = Arc::new(MetricsRegistry::new(defs, config.max_series_per_metric)?);
        let windows = Arc::new(LatencyWindows::new(config.window_capacity));
        let recorder = Recorder::new(
            Arc::clone(&registry),
            Arc::clone(&windows),
            clock,
            config.invalid_sample_policy,
        );
        let exporter = Exporter::new(Arc::clone(&registry), Arc::clone(&windows));

        tracing::debug!(
            metrics = registry.definitions().count(),
            window_capacity = config.window_capacity,
            "telemetry initialized"
        );

        Ok(Telemetry {
            config,
            registry,
            windows,
            recorder,
            exporter,
        })
    }
}
