//! Monitor service: the facade shared by the HTTP layer and `main`.
//!
//! Owns the supervisor, the producer side of the result queue and the
//! consumer task, and runs the shutdown sequence:
//!
//! 1. stop accepting new targets
//! 2. stop every scheduler
//! 3. wait (bounded) for the queue to drain
//! 4. signal the consumer and join it

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::metrics::MetricsCollector;
use crate::monitor::{
    MonitorError, Poller, SystemStats, TargetDefinition, TargetId, TargetSpec, TargetSupervisor,
    TargetWithStatus,
};
use crate::output::OutputSink;
use crate::pipeline::{PipelineCounters, ResultProcessor, ResultSender, result_queue};

struct Inner {
    supervisor: Arc<TargetSupervisor>,
    sender: ResultSender,
    counters: Arc<PipelineCounters>,
    metrics: Arc<MetricsCollector>,
    accepting: AtomicBool,
    shutdown: CancellationToken,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

/// Cheaply cloneable handle to the running monitor.
#[derive(Clone)]
pub struct MonitorService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MonitorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorService")
            .field("supervisor", &self.inner.supervisor)
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}

impl MonitorService {
    /// Wire the queue, supervisor and consumer, and spawn the consumer task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        poller: Arc<dyn Poller>,
        sink: Box<dyn OutputSink>,
        metrics: Arc<MetricsCollector>,
        pipeline: &PipelineConfig,
    ) -> Self {
        let (sender, receiver) = result_queue();
        let supervisor = Arc::new(
            TargetSupervisor::new(poller, sender.clone(), Arc::clone(&metrics))
                .with_error_backoff(pipeline.error_backoff),
        );

        let processor = ResultProcessor::new(
            receiver,
            sink,
            Arc::clone(&supervisor),
            Arc::clone(&metrics),
        );
        let counters = processor.counters();
        let shutdown = CancellationToken::new();
        let consumer = tokio::spawn(processor.run(shutdown.clone()));

        Self {
            inner: Arc::new(Inner {
                supervisor,
                sender,
                counters,
                metrics,
                accepting: AtomicBool::new(true),
                shutdown,
                consumer: Mutex::new(Some(consumer)),
            }),
        }
    }

    /// Validate a spec, assign it an id and start monitoring it.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidTarget` for an invalid spec and
    /// `MonitorError::ShuttingDown` once shutdown has begun.
    pub fn create(&self, spec: TargetSpec) -> Result<TargetDefinition, MonitorError> {
        if !self.is_accepting() {
            return Err(MonitorError::ShuttingDown);
        }
        let target = TargetDefinition::new(spec)?;
        self.inner.supervisor.start_monitoring(target.clone());

        // Shutdown may have swept the registry between the check and the start.
        if !self.is_accepting() {
            self.inner.supervisor.stop_monitoring(&target.id);
            return Err(MonitorError::ShuttingDown);
        }
        Ok(target)
    }

    pub fn list(&self) -> Vec<TargetWithStatus> {
        self.inner.supervisor.get_all_targets_with_status()
    }

    pub fn get(&self, id: &TargetId) -> Option<TargetWithStatus> {
        self.inner.supervisor.get_target_with_status(id)
    }

    /// Stop and remove a target.
    ///
    /// # Errors
    /// Returns `MonitorError::NotFound` if the id is not registered.
    pub fn delete(&self, id: &TargetId) -> Result<(), MonitorError> {
        if self.inner.supervisor.stop_monitoring(id) {
            Ok(())
        } else {
            Err(MonitorError::NotFound(*id))
        }
    }

    pub fn stats(&self) -> SystemStats {
        SystemStats {
            active_targets: self.inner.supervisor.get_active_count(),
            processed_messages: self.inner.counters.processed(),
            uptime_seconds: self.inner.supervisor.uptime().as_secs_f64(),
            queue_size: self.inner.sender.depth(),
            total_errors: self.inner.counters.errors(),
        }
    }

    /// Current number of queued, not yet received results.
    pub fn queue_depth(&self) -> usize {
        self.inner.sender.depth()
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.inner.metrics
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Run the shutdown sequence. Later calls only wait for the consumer.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        if self.inner.accepting.swap(false, Ordering::SeqCst) {
            tracing::info!("Shutting down monitor service");
        }

        self.inner.supervisor.stop_all();

        match tokio::time::timeout(drain_timeout, self.inner.sender.wait_drained()).await {
            Ok(()) => tracing::info!("Result queue drained"),
            Err(_) => tracing::warn!(
                remaining = self.inner.sender.unfinished(),
                timeout = ?drain_timeout,
                "Result queue did not drain in time"
            ),
        }

        self.inner.shutdown.cancel();

        let consumer = self.inner.consumer.lock().take();
        if let Some(handle) = consumer {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Output processor task failed");
            }
        }
        tracing::info!("Monitor service stopped");
    }

    #[cfg(test)]
    pub(crate) fn sender(&self) -> &ResultSender {
        &self.inner.sender
    }
}
