//! Monitor-specific error types.

use thiserror::Error;

use crate::monitor::TargetId;

/// Errors surfaced by target lifecycle operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Target spec failed validation.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// No target registered under this id.
    #[error("target not found: {0}")]
    NotFound(TargetId),

    /// The daemon is draining and no longer accepts targets.
    #[error("service is shutting down")]
    ShuttingDown,

    /// Failed to enqueue a result for the pipeline.
    #[error("result queue closed")]
    QueueClosed,
}
