use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;

use super::schema::{MetricDef, MetricKind};
use super::series::{Histogram, SeriesCell};
use crate::error::{Result, TelemetryError};

/// Label value substituted for every label once a metric hits its series cap.
pub const OVERFLOW_LABEL_VALUE: &str = "__overflow__";

#[derive(Debug)]
struct Family {
    def: MetricDef,
    series: RwLock<HashMap<Vec<String>, Arc<SeriesCell>>>,
}

/// Owns every declared metric and its label-keyed series.
///
/// The set of metrics is fixed at construction. Each metric guards its own
/// series map, and each series is updated through an atomic or its own mutex,
/// so concurrent writers to different series never wait on each other and
/// [`MetricsRegistry::snapshot`] only holds a map lock long enough to clone
/// series handles.
#[derive(Debug)]
pub struct MetricsRegistry {
    families: Vec<Family>,
    index: HashMap<String, usize>,
    max_series_per_metric: usize,
}

impl MetricsRegistry {
    pub fn new(defs: Vec<MetricDef>, max_series_per_metric: usize) -> Result<Self> {
        let mut families = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            def.validate()?;
            if index.contains_key(&def.name) {
                return Err(TelemetryError::InvalidDefinition {
                    metric: def.name,
                    reason: "declared more than once".to_string(),
                });
            }
            let mut series = HashMap::new();
            if def.labels.is_empty() {
                series.insert(Vec::new(), Arc::new(SeriesCell::for_def(&def)));
            }
            index.insert(def.name.clone(), families.len());
            families.push(Family {
                def,
                series: RwLock::new(series),
            });
        }
        Ok(Self {
            families,
            index,
            max_series_per_metric: max_series_per_metric.max(1),
        })
    }

    pub fn definition(&self, name: &str) -> Option<&MetricDef> {
        self.index.get(name).map(|idx| &self.families[*idx].def)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &MetricDef> {
        self.families.iter().map(|family| &family.def)
    }

    pub fn increment(&self, name: &str, labels: &[(&str, &str)], amount: u64) -> Result<()> {
        self.cell(name, MetricKind::Counter, labels)?.increment(amount);
        Ok(())
    }

    pub fn observe(&self, name: &str, labels: &[(&str, &str)], value: f64) -> Result<()> {
        self.cell(name, MetricKind::Histogram, labels)?.observe(value);
        Ok(())
    }

    pub fn set(&self, name: &str, labels: &[(&str, &str)], value: f64) -> Result<()> {
        self.cell(name, MetricKind::Gauge, labels)?.set(value);
        Ok(())
    }

    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        match self.existing(name, labels)?.as_ref() {
            SeriesCell::Counter(value) => Some(value.load(Ordering::Relaxed)),
            _ => None,
        }
    }

    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        match self.existing(name, labels)?.as_ref() {
            SeriesCell::Gauge(bits) => Some(f64::from_bits(bits.load(Ordering::Relaxed))),
            _ => None,
        }
    }

    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<HistogramSnapshot> {
        match self.existing(name, labels)?.as_ref() {
            SeriesCell::Histogram(histogram) => Some(HistogramSnapshot::capture(&histogram.lock())),
            _ => None,
        }
    }

    /// Point-in-time copy of every series, in declaration order.
    pub fn snapshot(&self) -> Vec<MetricSnapshot<'_>> {
        self.families
            .iter()
            .map(|family| {
                let cells: Vec<(Vec<String>, Arc<SeriesCell>)> = family
                    .series
                    .read()
                    .iter()
                    .map(|(labels, cell)| (labels.clone(), Arc::clone(cell)))
                    .collect();

                let mut series: Vec<SeriesSnapshot> = cells
                    .into_iter()
                    .map(|(labels, cell)| SeriesSnapshot {
                        labels,
                        value: SeriesValue::read(&cell),
                    })
                    .collect();
                series.sort_by(|a, b| a.labels.cmp(&b.labels));

                MetricSnapshot {
                    def: &family.def,
                    series,
                }
            })
            .collect()
    }

    fn family(&self, name: &str, kind: MetricKind) -> Result<&Family> {
        let family = self
            .index
            .get(name)
            .map(|idx| &self.families[*idx])
            .ok_or_else(|| TelemetryError::UnknownMetric {
                metric: name.to_string(),
            })?;
        if family.def.kind != kind {
            return Err(TelemetryError::KindMismatch {
                metric: name.to_string(),
                expected: kind,
                actual: family.def.kind,
            });
        }
        Ok(family)
    }

    fn cell(
        &self,
        name: &str,
        kind: MetricKind,
        labels: &[(&str, &str)],
    ) -> Result<Arc<SeriesCell>> {
        let family = self.family(name, kind)?;
        let values = family.def.label_values(labels)?;

        if let Some(cell) = family.series.read().get(&values) {
            return Ok(Arc::clone(cell));
        }

        let mut series = family.series.write();
        let key = if series.contains_key(&values) || series.len() < self.max_series_per_metric {
            values
        } else {
            let overflow = vec![OVERFLOW_LABEL_VALUE.to_string(); values.len()];
            if !series.contains_key(&overflow) {
                tracing::warn!(
                    metric = %family.def.name,
                    max_series = self.max_series_per_metric,
                    "series limit reached; folding new label sets into overflow series"
                );
            }
            overflow
        };
        let cell = series
            .entry(key)
            .or_insert_with(|| Arc::new(SeriesCell::for_def(&family.def)));
        Ok(Arc::clone(cell))
    }

    fn existing(&self, name: &str, labels: &[(&str, &str)]) -> Option<Arc<SeriesCell>> {
        let family = &self.families[*self.index.get(name)?];
        let values = family.def.label_values(labels).ok()?;
        family.series.read().get(&values).cloned()
    }
}

#[derive(Debug)]
pub struct MetricSnapshot<'a> {
    pub def: &'a MetricDef,
    pub series: Vec<SeriesSnapshot>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeriesSnapshot {
    /// Values in the metric's declared label order.
    pub labels: Vec<String>,
    pub value: SeriesValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SeriesValue {
    Counter(u64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
}

impl SeriesValue {
    fn read(cell: &SeriesCell) -> Self {
        match cell {
            SeriesCell::Counter(value) => Self::Counter(value.load(Ordering::Relaxed)),
            SeriesCell::Gauge(bits) => Self::Gauge(f64::from_bits(bits.load(Ordering::Relaxed))),
            SeriesCell::Histogram(histogram) => {
                Self::Histogram(HistogramSnapshot::capture(&histogram.lock()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistogramSnapshot {
    pub buckets: Vec<f64>,
    pub cumulative_counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramSnapshot {
    fn capture(histogram: &Histogram) -> Self {
        Self {
            buckets: histogram.buckets.clone(),
            cumulative_counts: histogram.bucket_counts.clone(),
            sum: histogram.sum,
            count: histogram.count,
        }
    }
}
