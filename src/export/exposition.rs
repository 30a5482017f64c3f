use std::fmt::Write as _;

use crate::metrics::{HistogramSnapshot, MetricSnapshot, SeriesValue};

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Renders the text exposition format: `# HELP`/`# TYPE` per metric, then
/// one line per series with labels in declared order. Histograms expand to
/// cumulative `_bucket` lines, `_sum` and `_count`.
pub fn render_exposition(metrics: &[MetricSnapshot<'_>]) -> String {
    let mut out = String::new();
    for metric in metrics {
        let name = metric.def.name.as_str();
        let _ = writeln!(out, "# HELP {name} {}", escape_help(&metric.def.help));
        let _ = writeln!(out, "# TYPE {name} {}", metric.def.kind);

        for series in &metric.series {
            let pairs: Vec<(&str, &str)> = metric
                .def
                .labels
                .iter()
                .map(String::as_str)
                .zip(series.labels.iter().map(String::as_str))
                .collect();
            match &series.value {
                SeriesValue::Counter(value) => {
                    let _ = writeln!(out, "{name}{} {value}", label_set(&pairs, None));
                }
                SeriesValue::Gauge(value) => {
                    let _ = writeln!(
                        out,
                        "{name}{} {}",
                        label_set(&pairs, None),
                        format_float(*value)
                    );
                }
                SeriesValue::Histogram(histogram) => {
                    write_histogram(&mut out, name, &pairs, histogram);
                }
            }
        }
    }
    out
}

fn write_histogram(
    out: &mut String,
    name: &str,
    pairs: &[(&str, &str)],
    histogram: &HistogramSnapshot,
) {
    for (bound, count) in histogram
        .buckets
        .iter()
        .zip(histogram.cumulative_counts.iter())
    {
        let le = format_float(*bound);
        let _ = writeln!(
            out,
            "{name}_bucket{} {count}",
            label_set(pairs, Some(le.as_str()))
        );
    }
    let _ = writeln!(
        out,
        "{name}_bucket{} {}",
        label_set(pairs, Some("+Inf")),
        histogram.count
    );
    let _ = writeln!(
        out,
        "{name}_sum{} {}",
        label_set(pairs, None),
        format_float(histogram.sum)
    );
    let _ = writeln!(
        out,
        "{name}_count{} {}",
        label_set(pairs, None),
        histogram.count
    );
}

fn label_set(pairs: &[(&str, &str)], le: Option<&str>) -> String {
    if pairs.is_empty() && le.is_none() {
        return String::new();
    }
    let mut parts: Vec<String> = pairs
        .iter()
        .map(|(label, value)| format!("{label}=\"{}\"", escape_label_value(value)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{le}\""));
    }
    format!("{{{}}}", parts.join(","))
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

pub fn escape_label_value(value: &str) -> String {
    let mut out = String::new();
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricDef, MetricsRegistry};

    fn registry() -> MetricsRegistry {
        MetricsRegistry::new(
            vec![
                MetricDef::counter(
                    "http_requests_total",
                    "Total HTTP requests.",
                    &["method", "endpoint", "status"],
                ),
                MetricDef::histogram(
                    "http_request_duration_seconds",
                    "HTTP request latency in seconds.",
                    &["method", "endpoint"],
                    &[0.1, 1.0],
                ),
                MetricDef::gauge("active_connections", "Active connections.", &[]),
            ],
            64,
        )
        .unwrap()
    }

    #[test]
    fn escapes_label_values() {
        assert_eq!(escape_label_value("a"), "a");
        assert_eq!(escape_label_value("a\"b"), "a\\\"b");
        assert_eq!(escape_label_value("a\\b"), "a\\\\b");
        assert_eq!(escape_label_value("a\nb"), "a\\nb");
    }

    #[test]
    fn counter_line_uses_declared_label_order() {
        let registry = registry();
        let labels = [("method", "GET"), ("endpoint", "/health"), ("status", "200")];
        for _ in 0..3 {
            registry.increment("http_requests_total", &labels, 1).unwrap();
        }
        let rendered = render_exposition(&registry.snapshot());
        assert!(rendered.contains("# HELP http_requests_total Total HTTP requests.\n"));
        assert!(rendered.contains("# TYPE http_requests_total counter\n"));
        assert!(rendered.contains(
            "http_requests_total{method=\"GET\",endpoint=\"/health\",status=\"200\"} 3\n"
        ));
    }

    #[test]
    fn histogram_lines_are_cumulative_with_sum_and_count() {
        let registry = registry();
        let labels = [("method", "GET"), ("endpoint", "/")];
        registry
            .observe("http_request_duration_seconds", &labels, 0.0625)
            .unwrap();
        registry
            .observe("http_request_duration_seconds", &labels, 0.5)
            .unwrap();
        registry
            .observe("http_request_duration_seconds", &labels, 3.0)
            .unwrap();

        let rendered = render_exposition(&registry.snapshot());
        for line in [
            "# TYPE http_request_duration_seconds histogram\n",
            "http_request_duration_seconds_bucket{method=\"GET\",endpoint=\"/\",le=\"0.1\"} 1\n",
            "http_request_duration_seconds_bucket{method=\"GET\",endpoint=\"/\",le=\"1\"} 2\n",
            "http_request_duration_seconds_bucket{method=\"GET\",endpoint=\"/\",le=\"+Inf\"} 3\n",
            "http_request_duration_seconds_sum{method=\"GET\",endpoint=\"/\"} 3.5625\n",
            "http_request_duration_seconds_count{method=\"GET\",endpoint=\"/\"} 3\n",
        ] {
            assert!(rendered.contains(line), "missing {line:?} in:\n{rendered}");
        }
    }

    #[test]
    fn unlabelled_gauge_renders_without_braces() {
        let registry = registry();
        let rendered = render_exposition(&registry.snapshot());
        assert!(rendered.contains("# TYPE active_connections gauge\nactive_connections 0\n"));

        registry.set("active_connections", &[], 7.0).unwrap();
        let rendered = render_exposition(&registry.snapshot());
        assert!(rendered.contains("active_connections 7\n"));
    }

    #[test]
    fn special_floats_use_exposition_spelling() {
        assert_eq!(format_float(f64::INFINITY), "+Inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(0.25), "0.25");
    }
}
