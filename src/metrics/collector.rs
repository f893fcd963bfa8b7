//! Atomic counters and gauges updated by the supervisor and the pipeline.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::monitor::TargetId;

/// Last reading observed for one target, labelled by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetValue {
    pub target_id: TargetId,
    pub target_name: String,
    pub value: i64,
}

/// Point-in-time copy of every metric.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub active_targets: i64,
    pub processed_messages: u64,
    pub processing_errors: u64,
    pub queue_size: u64,
    pub target_values: Vec<TargetValue>,
}

/// Metrics registry for the daemon.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    active_targets: AtomicI64,
    processed_messages: AtomicU64,
    processing_errors: AtomicU64,
    queue_size: AtomicU64,
    target_values: DashMap<TargetId, TargetValue>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Supervisor ==========

    pub fn record_target_started(&self) {
        self.active_targets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_target_stopped(&self) {
        self.active_targets.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_targets(&self) -> i64 {
        self.active_targets.load(Ordering::Relaxed)
    }

    // ========== Pipeline ==========

    pub fn record_processed(&self) {
        self.processed_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_messages(&self) -> u64 {
        self.processed_messages.load(Ordering::Relaxed)
    }

    pub fn record_processing_error(&self) {
        self.processing_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processing_errors(&self) -> u64 {
        self.processing_errors.load(Ordering::Relaxed)
    }

    pub fn set_queue_size(&self, size: usize) {
        self.queue_size.store(size as u64, Ordering::Relaxed);
    }

    pub fn queue_size(&self) -> u64 {
        self.queue_size.load(Ordering::Relaxed)
    }

    /// Set the last-value gauge for a target (last write wins).
    pub fn set_target_value(&self, target_id: TargetId, target_name: &str, value: i64) {
        self.target_values.insert(
            target_id,
            TargetValue {
                target_id,
                target_name: target_name.to_string(),
                value,
            },
        );
    }

    /// Drop the last-value series of a removed target.
    pub fn remove_target(&self, target_id: &TargetId) {
        self.target_values.remove(target_id);
    }

    pub fn target_value(&self, target_id: &TargetId) -> Option<i64> {
        self.target_values.get(target_id).map(|v| v.value)
    }

    /// Copy every metric out of the registry.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut target_values: Vec<TargetValue> = self
            .target_values
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        target_values.sort_by(|a, b| {
            a.target_name
                .cmp(&b.target_name)
                .then(a.target_id.cmp(&b.target_id))
        });

        MetricsSnapshot {
            active_targets: self.active_targets(),
            processed_messages: self.processed_messages(),
            processing_errors: self.processing_errors(),
            queue_size: self.queue_size(),
            target_values,
        }
    }
}
