//! In-process telemetry: fixed-schema metrics, bounded latency windows, and
//! two read paths (text exposition for scrapers, a JSON summary for
//! dashboards).

pub mod aggregate;
pub mod clock;
pub mod config;
mod error;
pub mod export;
pub mod metrics;
pub mod recorder;
mod telemetry;
pub mod window;

#[cfg(feature = "http")]
pub mod http;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{InvalidSamplePolicy, TelemetryConfig};
pub use error::{Result, TelemetryError};
pub use export::{
    CallStats, EXPOSITION_CONTENT_TYPE, EndpointStats, EndpointsReport, Exporter, MetricsSummary,
};
pub use metrics::{MetricDef, MetricKind, MetricsRegistry};
pub use recorder::Recorder;
pub use telemetry::{Telemetry, TelemetryBuilder};
pub use window::{LatencyWindows, WindowStore};
