//! Amaunator - Periodic Target Monitoring
//!
//! This crate provides the core of the Amaunator polling daemon. It can be
//! embedded as a library, or run as a standalone binary with the `amaunator`
//! executable.
//!
//! # Architecture
//!
//! - **Monitor**: One drift-corrected, cancellable scheduler task per target
//! - **Pipeline**: Unbounded result queue drained by a single consumer
//! - **Output**: Console, rotating file and Prometheus Pushgateway sinks
//! - **Metrics**: Atomic counters and gauges exported in Prometheus text format
//! - **Service**: Create/list/get/delete/stats facade with graceful shutdown
//! - **Server**: JSON REST API and `/metrics` scrape endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use amaunator::{MonitorService, RandomPoller, TargetSpec};
//! use amaunator::config::PipelineConfig;
//! use amaunator::metrics::MetricsCollector;
//! use amaunator::output::ConsoleSink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), amaunator::MonitorError> {
//!     let service = MonitorService::start(
//!         Arc::new(RandomPoller::new()),
//!         Box::new(ConsoleSink::default()),
//!         Arc::new(MetricsCollector::new()),
//!         &PipelineConfig::default(),
//!     );
//!
//!     service.create(TargetSpec::new("edge-router", 10, 2))?;
//!     tokio::time::sleep(Duration::from_secs(30)).await;
//!
//!     service.shutdown(Duration::from_secs(10)).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod service;

pub use monitor::{
    ERROR_SENTINEL, MonitorError, Poller, RandomPoller, SampleResult, SystemStats,
    TargetDefinition, TargetId, TargetSpec, TargetStatus, TargetWithStatus,
};
pub use output::{OutputError, OutputSink, create_sink};
pub use service::MonitorService;
