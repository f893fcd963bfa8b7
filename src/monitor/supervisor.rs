//! Target supervisor: lifecycle of per-target schedulers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::metrics::MetricsCollector;
use crate::monitor::registry::{RunningTask, TargetRegistry};
use crate::monitor::scheduler::{DEFAULT_ERROR_BACKOFF, Scheduler};
use crate::monitor::{Poller, TargetDefinition, TargetId, TargetWithStatus};
use crate::pipeline::ResultSender;

/// Owns the target registry and one scheduler task per target.
///
/// Every registry mutation happens under a single mutex that is never held
/// across an `.await`, so start/stop/update never observe a partial entry.
pub struct TargetSupervisor {
    registry: Mutex<TargetRegistry>,
    poller: Arc<dyn Poller>,
    sender: ResultSender,
    metrics: Arc<MetricsCollector>,
    error_backoff: Duration,
    started_at: Instant,
}

impl std::fmt::Debug for TargetSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetSupervisor")
            .field("active", &self.get_active_count())
            .field("poller", &self.poller.kind())
            .finish_non_exhaustive()
    }
}

impl TargetSupervisor {
    /// Create a supervisor whose schedulers feed `sender`.
    pub fn new(
        poller: Arc<dyn Poller>,
        sender: ResultSender,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry: Mutex::new(TargetRegistry::new()),
            poller,
            sender,
            metrics,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            started_at: Instant::now(),
        }
    }

    /// Set the pause schedulers apply after a failed cycle.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Start monitoring a target. A target that is already running is left alone.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_monitoring(&self, target: TargetDefinition) {
        let mut registry = self.registry.lock();
        if registry.contains(&target.id) {
            tracing::warn!(target_id = %target.id, name = %target.name, "Monitoring task already exists");
            return;
        }

        let cancel = CancellationToken::new();
        let scheduler = Scheduler::new(
            target.clone(),
            Arc::clone(&self.poller),
            self.sender.clone(),
            cancel.clone(),
        )
        .with_error_backoff(self.error_backoff);
        let handle = tokio::spawn(scheduler.run());

        let (id, name) = (target.id, target.name.clone());
        registry.insert(target, RunningTask { cancel, handle });
        drop(registry);

        self.metrics.record_target_started();
        tracing::info!(target_id = %id, name = %name, "Started monitoring task");
    }

    /// Stop monitoring a target. Returns `false` if the id was unknown.
    ///
    /// Signals cancellation and removes the entries; the scheduler task exits
    /// on its own at its next checkpoint.
    pub fn stop_monitoring(&self, id: &TargetId) -> bool {
        let removed = {
            let mut registry = self.registry.lock();
            registry.remove(id).inspect(RunningTask::cancel)
        };

        match removed {
            Some(_task) => {
                self.metrics.record_target_stopped();
                self.metrics.remove_target(id);
                tracing::info!(target_id = %id, "Stopped monitoring task");
                true
            }
            None => {
                tracing::debug!(target_id = %id, "No monitoring task found");
                false
            }
        }
    }

    /// Stop every running target.
    pub fn stop_all(&self) {
        let ids = self.registry.lock().ids();
        tracing::info!(count = ids.len(), "Stopping all monitoring tasks");
        for id in &ids {
            self.stop_monitoring(id);
        }
        tracing::info!("All monitoring tasks stopped");
    }

    pub fn get_target(&self, id: &TargetId) -> Option<TargetDefinition> {
        self.registry.lock().definition(id).cloned()
    }

    pub fn get_target_with_status(&self, id: &TargetId) -> Option<TargetWithStatus> {
        self.registry.lock().with_status(id)
    }

    pub fn get_all_targets_with_status(&self) -> Vec<TargetWithStatus> {
        self.registry.lock().all_with_status()
    }

    pub fn get_active_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Apply a processed reading. Unknown ids are ignored: the target may have
    /// been removed while its result was in flight.
    pub fn update_status(&self, id: &TargetId, value: i64, timestamp: DateTime<Utc>) {
        if !self.registry.lock().record(id, value, timestamp) {
            tracing::debug!(target_id = %id, "Status update for removed target ignored");
        }
    }

    /// Time since the supervisor was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[cfg(test)]
    fn registry_consistent(&self) -> bool {
        self.registry.lock().is_consistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{TargetSpec, TargetStatus};
    use crate::pipeline::{ResultReceiver, result_queue};

    /// Poller that returns immediately with a fixed reading.
    struct FixedPoller(i64);

    #[async_trait::async_trait]
    impl Poller for FixedPoller {
        fn kind(&self) -> &str {
            "fixed"
        }

        async fn poll(&self, _target: &TargetDefinition) -> i64 {
            self.0
        }
    }

    fn supervisor() -> (TargetSupervisor, ResultReceiver, Arc<MetricsCollector>) {
        let (tx, rx) = result_queue();
        let metrics = Arc::new(MetricsCollector::new());
        let supervisor =
            TargetSupervisor::new(Arc::new(FixedPoller(1)), tx, Arc::clone(&metrics));
        (supervisor, rx, metrics)
    }

    fn target(interval: u64, timeout: u64) -> TargetDefinition {
        TargetDefinition::new(TargetSpec::new("Test Target", interval, timeout)).unwrap()
    }

    #[tokio::test]
    async fn test_start_monitoring() {
        let (supervisor, _rx, metrics) = supervisor();
        let target = target(10, 2);

        supervisor.start_monitoring(target.clone());

        assert_eq!(supervisor.get_active_count(), 1);
        assert_eq!(supervisor.get_target(&target.id), Some(target.clone()));
        let view = supervisor.get_target_with_status(&target.id).unwrap();
        assert_eq!(view.status, TargetStatus::default());
        assert_eq!(metrics.active_targets(), 1);
        assert!(supervisor.registry_consistent());

        supervisor.stop_all();
    }

    #[tokio::test]
    async fn test_stop_monitoring() {
        let (supervisor, _rx, metrics) = supervisor();
        let target = target(10, 2);
        supervisor.start_monitoring(target.clone());

        assert!(supervisor.stop_monitoring(&target.id));

        assert!(supervisor.get_target(&target.id).is_none());
        assert!(supervisor.get_target_with_status(&target.id).is_none());
        assert_eq!(supervisor.get_active_count(), 0);
        assert_eq!(metrics.active_targets(), 0);
        assert!(supervisor.registry_consistent());
    }

    #[tokio::test]
    async fn test_stop_monitoring_drops_value_series() {
        let (supervisor, _rx, metrics) = supervisor();
        let target = target(10, 2);
        supervisor.start_monitoring(target.clone());
        metrics.set_target_value(target.id, &target.name, 17);

        supervisor.stop_monitoring(&target.id);

        assert_eq!(metrics.target_value(&target.id), None);
        assert!(metrics.snapshot().target_values.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_start_ignored() {
        let (supervisor, _rx, metrics) = supervisor();
        let target = target(10, 2);
        supervisor.start_monitoring(target.clone());
        supervisor.start_monitoring(target);

        assert_eq!(supervisor.get_active_count(), 1);
        assert_eq!(metrics.active_targets(), 1);
        supervisor.stop_all();
    }

    #[tokio::test]
    async fn test_stop_unknown_target() {
        let (supervisor, _rx, metrics) = supervisor();
        let known = target(10, 2);
        supervisor.start_monitoring(known.clone());

        assert!(!supervisor.stop_monitoring(&target(10, 2).id));

        assert_eq!(supervisor.get_active_count(), 1);
        assert_eq!(metrics.active_targets(), 1);
        assert!(supervisor.get_target(&known.id).is_some());
        supervisor.stop_all();
    }

    #[tokio::test]
    async fn test_stop_all_clears_registry() {
        let (supervisor, _rx, _metrics) = supervisor();
        for _ in 0..5 {
            supervisor.start_monitoring(target(10, 2));
        }
        assert_eq!(supervisor.get_all_targets_with_status().len(), 5);

        supervisor.stop_all();

        assert_eq!(supervisor.get_active_count(), 0);
        assert!(supervisor.get_all_targets_with_status().is_empty());
        assert!(supervisor.registry_consistent());
    }

    #[tokio::test]
    async fn test_update_status_counts_errors() {
        let (supervisor, _rx, _metrics) = supervisor();
        let target = target(60, 1);
        supervisor.start_monitoring(target.clone());

        let values = [3, -1, 8, -1, -7, 12];
        for value in values {
            supervisor.update_status(&target.id, value, Utc::now());
        }

        let status = supervisor.get_target_with_status(&target.id).unwrap().status;
        assert_eq!(status.check_count, values.len() as u64);
        assert_eq!(status.error_count, 3);
        assert!(status.error_count <= status.check_count);
        assert_eq!(status.last_value, Some(12));
        supervisor.stop_all();
    }

    #[tokio::test]
    async fn test_update_status_for_removed_target_is_noop() {
        let (supervisor, _rx, _metrics) = supervisor();
        let target = target(60, 1);
        supervisor.start_monitoring(target.clone());
        supervisor.stop_monitoring(&target.id);

        supervisor.update_status(&target.id, 5, Utc::now());

        assert!(supervisor.get_target_with_status(&target.id).is_none());
        assert!(supervisor.registry_consistent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_target_emits_results() {
        let (supervisor, mut rx, _metrics) = supervisor();
        let target = target(1, 1);
        supervisor.start_monitoring(target.clone());

        let result = rx.recv().await.unwrap();
        assert_eq!(result.target_id, target.id);
        assert_eq!(result.value, 1);
        supervisor.stop_all();
    }
}
