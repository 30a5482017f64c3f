//! Read paths. Both serializers work from snapshots and never mutate state.

mod exposition;
mod summary;

use std::sync::Arc;

use crate::error::Result;
use crate::metrics::MetricsRegistry;
use crate::metrics::catalog::ACTIVE_CONNECTIONS;
use crate::window::LatencyWindows;

pub use exposition::{EXPOSITION_CONTENT_TYPE, escape_label_value, render_exposition};
pub use summary::{CallStats, EndpointStats, EndpointsReport, MetricsSummary};

#[derive(Clone, Debug)]
pub struct Exporter {
    registry: Arc<MetricsRegistry>,
    windows: Arc<LatencyWindows>,
}

impl Exporter {
    pub fn new(registry: Arc<MetricsRegistry>, windows: Arc<LatencyWindows>) -> Self {
        Self { registry, windows }
    }

    pub fn render_exposition(&self) -> String {
        render_exposition(&self.registry.snapshot())
    }

    pub fn summary(&self) -> Result<MetricsSummary> {
        MetricsSummary::build(&self.windows, self.active_connections(), now_rfc3339()?)
    }

    pub fn endpoints(&self) -> Result<EndpointsReport> {
        Ok(EndpointsReport {
            timestamp: now_rfc3339()?,
            endpoints: summary::endpoint_stats(&self.windows.requests.snapshot()),
        })
    }

    pub fn active_connections(&self) -> u64 {
        self.registry
            .gauge_value(ACTIVE_CONNECTIONS, &[])
            .map(|value| value.max(0.0) as u64)
            .unwrap_or(0)
    }
}

fn now_rfc3339() -> Result<String> {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|err| crate::error::TelemetryError::Timestamp(err.to_string()))
}
