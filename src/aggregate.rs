//! Derived statistics over raw window samples.
//!
//! Nothing here is cached: every call recomputes from the samples it is
//! given. The p95 is an order statistic over a full sort, which stays cheap
//! because windows are capped; unbounded windows would need a streaming
//! quantile estimator instead.

use serde::Serialize;

/// Statistics over one window, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowStats {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
}

impl WindowStats {
    /// `None` for an empty window.
    pub fn compute(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len();
        let sum: f64 = samples.iter().sum();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            count,
            avg: sum / count as f64,
            min,
            max,
            p95: p95(samples)?,
        })
    }

    pub fn to_millis(self) -> DurationsMs {
        DurationsMs {
            avg_duration_ms: seconds_to_rounded_millis(self.avg),
            min_duration_ms: seconds_to_rounded_millis(self.min),
            max_duration_ms: seconds_to_rounded_millis(self.max),
            p95_duration_ms: seconds_to_rounded_millis(self.p95),
        }
    }
}

/// Window statistics in milliseconds, rounded to two decimals.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DurationsMs {
    pub avg_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub p95_duration_ms: f64,
}

/// Sorts a copy and takes the element at `floor(n * 0.95)`, clamped to the
/// last index.
pub fn p95(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = ((sorted.len() as f64) * 0.95).floor() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}

/// Mean over the concatenation of every window, in seconds.
pub fn pooled_mean<'a>(windows: impl IntoIterator<Item = &'a [f64]>) -> Option<(usize, f64)> {
    let (count, sum) = windows
        .into_iter()
        .fold((0usize, 0.0f64), |(count, sum), window| {
            (count + window.len(), sum + window.iter().sum::<f64>())
        });
    if count == 0 {
        return None;
    }
    Some((count, sum / count as f64))
}

pub fn seconds_to_rounded_millis(seconds: f64) -> f64 {
    round2(seconds * 1000.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sample_reports_itself_everywhere() {
        let stats = WindowStats::compute(&[0.42]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.avg, 0.42);
        assert_eq!(stats.min, 0.42);
        assert_eq!(stats.max, 0.42);
        assert_eq!(stats.p95, 0.42);
    }

    #[test]
    fn p95_of_one_to_hundred_is_sorted_index_95() {
        let mut samples: Vec<f64> = (1..=100).map(f64::from).collect();
        samples.reverse();
        // floor(100 * 0.95) = 95 -> the 96th smallest value.
        assert_eq!(p95(&samples), Some(96.0));
    }

    #[test]
    fn p95_of_two_samples_is_the_larger() {
        assert_eq!(p95(&[0.2, 0.1]), Some(0.2));
    }

    #[test]
    fn empty_window_has_no_stats() {
        assert!(WindowStats::compute(&[]).is_none());
        assert!(p95(&[]).is_none());
        assert!(pooled_mean(Vec::<&[f64]>::new()).is_none());
    }

    #[test]
    fn min_max_avg() {
        let stats = WindowStats::compute(&[0.3, 0.1, 0.2]).unwrap();
        assert_eq!(stats.min, 0.1);
        assert_eq!(stats.max, 0.3);
        assert!((stats.avg - 0.2).abs() < 1e-12);
    }

    #[test]
    fn pooled_mean_weights_by_sample_count() {
        let fast = [0.01; 9];
        let slow = [1.0];
        let (count, mean) = pooled_mean([&fast[..], &slow[..]]).unwrap();
        assert_eq!(count, 10);
        // Mean of per-window means would be 0.505.
        assert!((mean - 0.109).abs() < 1e-12);
    }

    #[test]
    fn millis_are_rounded_to_two_places() {
        assert_eq!(seconds_to_rounded_millis(0.123456), 123.46);
        assert_eq!(seconds_to_rounded_millis(0.5), 500.0);
        let millis = WindowStats::compute(&[0.0101, 0.0202]).unwrap().to_millis();
        assert_eq!(millis.min_duration_ms, 10.1);
        assert_eq!(millis.max_duration_ms, 20.2);
        assert_eq!(millis.avg_duration_ms, 15.15);
    }
}
