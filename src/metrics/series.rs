use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::schema::{MetricDef, MetricKind};

#[derive(Debug)]
pub(crate) enum SeriesCell {
    Counter(AtomicU64),
    /// `f64` bit pattern.
    Gauge(AtomicU64),
    Histogram(Mutex<Histogram>),
}

impl SeriesCell {
    pub(crate) fn for_def(def: &MetricDef) -> Self {
        match def.kind {
            MetricKind::Counter => Self::Counter(AtomicU64::new(0)),
            MetricKind::Gauge => Self::Gauge(AtomicU64::new(0f64.to_bits())),
            MetricKind::Histogram => Self::Histogram(Mutex::new(Histogram::new(&def.buckets))),
        }
    }

    pub(crate) fn increment(&self, amount: u64) {
        if let Self::Counter(value) = self {
            let _ = value.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_add(amount))
            });
        }
    }

    pub(crate) fn set(&self, value: f64) {
        if let Self::Gauge(bits) = self {
            bits.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    pub(crate) fn observe(&self, value: f64) {
        if let Self::Histogram(histogram) = self {
            histogram.lock().observe(value);
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Histogram {
    pub(crate) buckets: Vec<f64>,
    /// Cumulative: `bucket_counts[i]` counts every observation `<= buckets[i]`.
    pub(crate) bucket_counts: Vec<u64>,
    pub(crate) sum: f64,
    pub(crate) count: u64,
}

impl Histogram {
    fn new(buckets: &[f64]) -> Self {
        Self {
            buckets: buckets.to_vec(),
            bucket_counts: vec![0; buckets.len()],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, value: f64) {
        self.sum += value;
        self.count = self.count.saturating_add(1);
        for (idx, bound) in self.buckets.iter().enumerate() {
            if value <= *bound {
                self.bucket_counts[idx] = self.bucket_counts[idx].saturating_add(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_are_cumulative() {
        let def = MetricDef::histogram("h_seconds", "x", &[], &[0.1, 0.5, 1.0]);
        let cell = SeriesCell::for_def(&def);
        cell.observe(0.05);
        cell.observe(0.3);
        cell.observe(7.0);

        let SeriesCell::Histogram(histogram) = &cell else {
            panic!("expected histogram cell");
        };
        let histogram = histogram.lock();
        assert_eq!(histogram.bucket_counts, vec![1, 2, 2]);
        assert_eq!(histogram.count, 3);
        assert!((histogram.sum - 7.35).abs() < 1e-9);
    }

    #[test]
    fn gauge_overwrites_and_counter_accumulates() {
        let gauge = SeriesCell::for_def(&MetricDef::gauge("g", "x", &[]));
        gauge.set(4.0);
        gauge.set(2.5);
        let SeriesCell::Gauge(bits) = &gauge else {
            panic!("expected gauge cell");
        };
        assert_eq!(f64::from_bits(bits.load(Ordering::Relaxed)), 2.5);

        let counter = SeriesCell::for_def(&MetricDef::counter("c_total", "x", &[]));
        counter.increment(1);
        counter.increment(4);
        let SeriesCell::Counter(value) = &counter else {
            panic!("expected counter cell");
        };
        assert_eq!(value.load(Ordering::Relaxed), 5);
    }
}
