//! Drift-corrected periodic scheduler for a single target.
//!
//! Each cycle's deadline is anchored to the previous deadline plus the
//! interval, not to the completion time of the last poll, so slow cycles do
//! not push the schedule back.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use strum_macros::{AsRefStr, Display};
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_util::sync::CancellationToken;

use crate::monitor::{ERROR_SENTINEL, Poller, SampleResult, TargetDefinition};
use crate::pipeline::ResultSender;

/// Default pause after a failed cycle.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Scheduler lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Waiting,
    Sampling,
    Stopped,
}

/// Outcome of one sampling attempt.
enum CycleOutcome {
    Emitted,
    Failed,
}

/// Periodic poll loop for one target.
pub struct Scheduler {
    target: TargetDefinition,
    poller: Arc<dyn Poller>,
    sender: ResultSender,
    cancel: CancellationToken,
    error_backoff: Duration,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("target", &self.target)
            .field("poller", &self.poller.kind())
            .field("error_backoff", &self.error_backoff)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        target: TargetDefinition,
        poller: Arc<dyn Poller>,
        sender: ResultSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            poller,
            sender,
            cancel,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    /// Set the pause applied after a failed cycle.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Run until the cancellation token fires.
    pub async fn run(self) {
        let interval = self.target.interval_duration();
        let mut next_deadline = advance(Instant::now(), interval);
        let mut state = SchedulerState::Idle;

        tracing::info!(
            target_id = %self.target.id,
            name = %self.target.name,
            interval_secs = self.target.interval,
            poller = self.poller.kind(),
            "Starting monitoring"
        );

        loop {
            state = match state {
                SchedulerState::Idle => SchedulerState::Waiting,
                SchedulerState::Waiting => {
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => SchedulerState::Stopped,
                        () = sleep_until(next_deadline) => SchedulerState::Sampling,
                    }
                }
                SchedulerState::Sampling => {
                    let outcome = self.run_cycle().await;
                    next_deadline = advance(next_deadline, interval);
                    match outcome {
                        CycleOutcome::Emitted => SchedulerState::Waiting,
                        CycleOutcome::Failed => self.backoff().await,
                    }
                }
                SchedulerState::Stopped => break,
            };
        }

        tracing::info!(target_id = %self.target.id, name = %self.target.name, "Stop signal received, scheduler exited");
    }

    /// Take one bounded sample and enqueue it.
    async fn run_cycle(&self) -> CycleOutcome {
        let poll = timeout(
            self.target.timeout_duration(),
            self.poller.poll(&self.target),
        );

        let value = match AssertUnwindSafe(poll).catch_unwind().await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => {
                tracing::warn!(
                    target_id = %self.target.id,
                    name = %self.target.name,
                    timeout_secs = self.target.timeout,
                    "Poll timed out"
                );
                ERROR_SENTINEL
            }
            Err(panic) => {
                tracing::error!(
                    target_id = %self.target.id,
                    name = %self.target.name,
                    error = panic_message(&*panic),
                    "Poll failed"
                );
                return CycleOutcome::Failed;
            }
        };

        match self.sender.send(SampleResult::new(self.target.id, value)) {
            Ok(()) => {
                tracing::debug!(target_id = %self.target.id, value, "Queued result");
                CycleOutcome::Emitted
            }
            Err(e) => {
                tracing::error!(target_id = %self.target.id, error = %e, "Failed to queue result");
                CycleOutcome::Failed
            }
        }
    }

    /// Pause after a failed cycle; cancellation cuts the pause short.
    async fn backoff(&self) -> SchedulerState {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => SchedulerState::Stopped,
            () = sleep(self.error_backoff) => SchedulerState::Waiting,
        }
    }
}

/// Roughly 30 years; the deadline used once `deadline + interval` overflows.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Next deadline, saturating to a far-future instant instead of overflowing.
fn advance(deadline: Instant, interval: Duration) -> Instant {
    deadline
        .checked_add(interval)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
