//! Result Pipeline
//!
//! Carries samples from every target scheduler to the single output consumer.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌─────────────────┐   ┌────────────┐
//! │ Scheduler  │──▶│ ResultQueue│──▶│ ResultProcessor │──▶│ OutputSink │
//! │ (N tasks)  │   │ (unbounded)│   │ (single task)   │   │            │
//! └────────────┘   └────────────┘   └─────────────────┘   └────────────┘
//! ```
//!
//! Results are handled in emission order. Shutdown drains the queue with
//! [`ResultSender::wait_drained`] before the processor is cancelled.

mod processor;
mod queue;

pub use processor::{PipelineCounters, ResultProcessor, UNKNOWN_TARGET};
pub use queue::{ResultReceiver, ResultSender, result_queue};
