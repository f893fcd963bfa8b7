//! Prometheus metrics exporter.
//!
//! Renders a [`MetricsCollector`] snapshot in the Prometheus text format.

use std::fmt::Write;
use std::sync::Arc;

use super::collector::MetricsCollector;

/// Content type of the Prometheus text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Default metric name prefix.
pub const DEFAULT_NAMESPACE: &str = "amaunator";

/// Prometheus metrics exporter.
#[derive(Debug, Clone)]
pub struct PrometheusExporter {
    collector: Arc<MetricsCollector>,
    namespace: String,
}

impl PrometheusExporter {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self::with_namespace(collector, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(collector: Arc<MetricsCollector>, namespace: impl Into<String>) -> Self {
        Self {
            collector,
            namespace: namespace.into(),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let snapshot = self.collector.snapshot();
        let mut output = String::new();

        self.write_header(
            &mut output,
            "active_targets",
            "Number of currently active monitoring targets",
            "gauge",
        );
        self.write_sample(&mut output, "active_targets", &[], snapshot.active_targets);

        self.write_header(
            &mut output,
            "processed_messages_total",
            "Total number of processed monitoring results",
            "counter",
        );
        self.write_sample(
            &mut output,
            "processed_messages_total",
            &[],
            snapshot.processed_messages,
        );

        self.write_header(
            &mut output,
            "processing_errors_total",
            "Total number of errors during processing",
            "counter",
        );
        self.write_sample(
            &mut output,
            "processing_errors_total",
            &[],
            snapshot.processing_errors,
        );

        self.write_header(
            &mut output,
            "queue_size",
            "Current size of the result queue",
            "gauge",
        );
        self.write_sample(&mut output, "queue_size", &[], snapshot.queue_size);

        if !snapshot.target_values.is_empty() {
            self.write_header(
                &mut output,
                "target_value",
                "Current value of a monitoring target",
                "gauge",
            );
            for entry in &snapshot.target_values {
                let id = entry.target_id.to_string();
                self.write_sample(
                    &mut output,
                    "target_value",
                    &[("target_name", &entry.target_name), ("target_id", &id)],
                    entry.value,
                );
            }
        }

        output
    }

    fn write_header(&self, output: &mut String, name: &str, help: &str, kind: &str) {
        let full_name = format!("{}_{}", self.namespace, name);
        let _ = writeln!(output, "# HELP {} {}", full_name, help);
        let _ = writeln!(output, "# TYPE {} {}", full_name, kind);
    }

    fn write_sample(
        &self,
        output: &mut String,
        name: &str,
        labels: &[(&str, &str)],
        value: impl std::fmt::Display,
    ) {
        let full_name = format!("{}_{}", self.namespace, name);
        if labels.is_empty() {
            let _ = writeln!(output, "{} {}", full_name, value);
            return;
        }

        let labels_str = labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(output, "{}{{{}}} {}", full_name, labels_str, value);
    }
}

/// Escape a label value per the text exposition format.
pub fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_prometheus_export_empty() {
        let exporter = PrometheusExporter::new(Arc::new(MetricsCollector::new()));
        let output = exporter.export();

        assert!(output.contains("# HELP amaunator_active_targets"));
        assert!(output.contains("# TYPE amaunator_active_targets gauge"));
        assert!(output.contains("amaunator_active_targets 0"));
        assert!(output.contains("amaunator_processed_messages_total 0"));
        assert!(!output.contains("amaunator_target_value"));
    }

    #[test]
    fn test_prometheus_export_with_labels() {
        let collector = Arc::new(MetricsCollector::new());
        let id = Uuid::new_v4();
        collector.record_target_started();
        collector.record_processed();
        collector.set_target_value(id, "web \"edge\"", 42);

        let output = PrometheusExporter::new(collector).export();

        assert!(output.contains("amaunator_active_targets 1"));
        assert!(output.contains("amaunator_processed_messages_total 1"));
        assert!(output.contains(&format!(
            "amaunator_target_value{{target_name=\"web \\\"edge\\\"\",target_id=\"{}\"}} 42",
            id
        )));
    }

    #[test]
    fn test_prometheus_custom_namespace() {
        let exporter =
            PrometheusExporter::with_namespace(Arc::new(MetricsCollector::new()), "custom");
        let output = exporter.export();

        assert!(output.contains("custom_queue_size"));
        assert!(!output.contains("amaunator_"));
    }
}
