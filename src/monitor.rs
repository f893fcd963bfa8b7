//! Monitor Layer
//!
//! Supervises a dynamic set of targets, each sampled by its own Tokio task
//! that feeds the shared result pipeline.
//!
//! # Architecture
//!
//! - [`TargetSupervisor`]: Owns the registry and starts/stops one scheduler per target
//! - [`Scheduler`]: Drift-corrected, cancellable poll loop for one target
//! - [`Poller`]: Single sample attempt; failures collapse to [`ERROR_SENTINEL`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use amaunator::metrics::MetricsCollector;
//! use amaunator::monitor::{RandomPoller, TargetDefinition, TargetSpec, TargetSupervisor};
//! use amaunator::pipeline::result_queue;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), amaunator::MonitorError> {
//! let (tx, _rx) = result_queue();
//! let supervisor = TargetSupervisor::new(
//!     Arc::new(RandomPoller::new()),
//!     tx,
//!     Arc::new(MetricsCollector::new()),
//! );
//! let target = TargetDefinition::new(TargetSpec::new("edge-router", 10, 2))?;
//! supervisor.start_monitoring(target);
//! # Ok(())
//! # }
//! ```

mod error;
mod poller;
mod registry;
mod scheduler;
mod supervisor;
mod types;

pub use error::MonitorError;
pub use poller::{Poller, RandomPoller};
pub use registry::{RunningTask, TargetRegistry};
pub use scheduler::{DEFAULT_ERROR_BACKOFF, Scheduler, SchedulerState};
pub(crate) use scheduler::panic_message;
pub use supervisor::TargetSupervisor;
pub use types::{
    ERROR_SENTINEL, MIN_PERIOD_SECS, SampleResult, SystemStats, TargetDefinition, TargetId,
    TargetSpec, TargetStatus, TargetWithStatus,
};
