//! Metrics Layer
//!
//! Process-wide counters and gauges with a Prometheus text exporter.
//!
//! - [`MetricsCollector`]: Atomic counters (processed, errors) and gauges
//!   (active targets, queue depth, last value per target)
//! - [`PrometheusExporter`]: Text exposition served on `/metrics`

mod collector;
mod prometheus;

pub use collector::{MetricsCollector, MetricsSnapshot, TargetValue};
pub use prometheus::{CONTENT_TYPE, DEFAULT_NAMESPACE, PrometheusExporter, escape_label};
