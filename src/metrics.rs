//! Metric primitives: declared definitions, label-keyed series and the
//! registry that owns them.

pub mod catalog;
mod registry;
mod schema;
mod series;

pub use registry::{
    HistogramSnapshot, MetricSnapshot, MetricsRegistry, OVERFLOW_LABEL_VALUE, SeriesSnapshot,
    SeriesValue,
};
pub use schema::{MetricDef, MetricKind};
