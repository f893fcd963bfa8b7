//! Result processor: the single consumer of the result queue.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::metrics::MetricsCollector;
use crate::monitor::{SampleResult, TargetSupervisor, panic_message};
use crate::output::{OutputError, OutputSink};
use crate::pipeline::ResultReceiver;

/// Name reported for results whose target has already been removed.
pub const UNKNOWN_TARGET: &str = "unknown";

/// Cumulative processor counters, shared with the stats endpoint.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    processed: AtomicU64,
    errors: AtomicU64,
}

impl PipelineCounters {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Drains the result queue into the output sink, one item at a time.
pub struct ResultProcessor {
    receiver: ResultReceiver,
    sink: Box<dyn OutputSink>,
    supervisor: Arc<TargetSupervisor>,
    metrics: Arc<MetricsCollector>,
    counters: Arc<PipelineCounters>,
}

impl std::fmt::Debug for ResultProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultProcessor")
            .field("sink", &self.sink.kind())
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl ResultProcessor {
    pub fn new(
        receiver: ResultReceiver,
        sink: Box<dyn OutputSink>,
        supervisor: Arc<TargetSupervisor>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            receiver,
            sink,
            supervisor,
            metrics,
            counters: Arc::new(PipelineCounters::default()),
        }
    }

    /// Shared handle to the processed/error counters.
    pub fn counters(&self) -> Arc<PipelineCounters> {
        Arc::clone(&self.counters)
    }

    /// Run until `shutdown` fires and the queue is observed empty.
    ///
    /// Queued items take priority over the shutdown signal, and once the
    /// signal has fired any item still queued is processed before exiting.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(sink = self.sink.kind(), "Output processor started");

        loop {
            self.metrics.set_queue_size(self.receiver.depth());

            let result = tokio::select! {
                biased;
                item = self.receiver.recv() => match item {
                    Some(result) => result,
                    None => {
                        tracing::warn!("Result queue closed");
                        break;
                    }
                },
                () = shutdown.cancelled() => match self.receiver.try_recv() {
                    Some(result) => result,
                    None => break,
                },
            };

            self.process(result).await;
            self.receiver.task_done();
        }

        self.metrics.set_queue_size(self.receiver.depth());
        tracing::info!(
            processed = self.counters.processed(),
            errors = self.counters.errors(),
            "Output processor stopped"
        );
    }

    /// Process one item; failures are counted and never escape.
    async fn process(&mut self, result: SampleResult) {
        let outcome = AssertUnwindSafe(self.deliver(&result))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(&*panic).to_string(),
        };

        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_processing_error();
        tracing::error!(
            target_id = %result.target_id,
            value = result.value,
            error = %error,
            "Error processing result"
        );
    }

    async fn deliver(&mut self, result: &SampleResult) -> Result<(), OutputError> {
        let known = self.supervisor.get_target(&result.target_id);
        let target_name = known
            .as_ref()
            .map_or(UNKNOWN_TARGET, |t| t.name.as_str())
            .to_string();

        self.supervisor
            .update_status(&result.target_id, result.value, result.timestamp);

        self.sink.handle(result, &target_name).await?;

        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_processed();
        // Removed targets have already dropped their series.
        if known.is_some() {
            self.metrics
                .set_target_value(result.target_id, &target_name, result.value);
        }
        Ok(())
    }
}
