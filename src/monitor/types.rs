//! Core data types for the monitor layer.
//!
//! - [`TargetSpec`]: Creation request for a target (name, interval, timeout)
//! - [`TargetDefinition`]: Validated target with a generated identity
//! - [`TargetStatus`]: Latest observed status, mutated only by the pipeline
//! - [`SampleResult`]: One reading emitted by a scheduler cycle
//! - [`SystemStats`]: Read-only snapshot of daemon counters

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::monitor::MonitorError;

/// Reading value that signals a failed poll (timeout, error, or negative reading).
pub const ERROR_SENTINEL: i64 = -1;

/// Minimum interval and timeout, in seconds.
pub const MIN_PERIOD_SECS: u64 = 1;

/// Unique target identifier.
pub type TargetId = Uuid;

/// Request payload for creating a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Human-readable name.
    pub name: String,
    /// Seconds between poll cycles.
    pub interval: u64,
    /// Seconds allowed per poll attempt.
    pub timeout: u64,
}

impl TargetSpec {
    /// Create a new target spec.
    pub fn new(name: impl Into<String>, interval: u64, timeout: u64) -> Self {
        Self {
            name: name.into(),
            interval,
            timeout,
        }
    }

    /// Check the name and both periods.
    ///
    /// # Errors
    /// Returns `MonitorError::InvalidTarget` if the name is empty, either period
    /// is below one second, or `interval < timeout`.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::InvalidTarget(
                "name cannot be empty".to_string(),
            ));
        }
        if self.interval < MIN_PERIOD_SECS {
            return Err(MonitorError::InvalidTarget(format!(
                "interval must be at least {MIN_PERIOD_SECS}s"
            )));
        }
        if self.timeout < MIN_PERIOD_SECS {
            return Err(MonitorError::InvalidTarget(format!(
                "timeout must be at least {MIN_PERIOD_SECS}s"
            )));
        }
        if self.interval < self.timeout {
            return Err(MonitorError::InvalidTarget(format!(
                "interval ({}s) must be equal to or greater than timeout ({}s)",
                self.interval, self.timeout
            )));
        }
        Ok(())
    }
}

/// A validated monitoring target.
///
/// Only constructible through [`TargetDefinition::new`], which enforces
/// `interval >= timeout >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDefinition {
    pub id: TargetId,
    pub name: String,
    pub interval: u64,
    pub timeout: u64,
}

impl TargetDefinition {
    /// Validate a spec and assign a fresh identity.
    pub fn new(spec: TargetSpec) -> Result<Self, MonitorError> {
        spec.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: spec.name,
            interval: spec.interval,
            timeout: spec.timeout,
        })
    }

    /// Poll interval as a `Duration`.
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Poll timeout as a `Duration`.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Latest observed status of a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    pub last_check: Option<DateTime<Utc>>,
    pub last_value: Option<i64>,
    pub check_count: u64,
    pub error_count: u64,
}

impl TargetStatus {
    /// Apply one processed reading.
    pub fn record(&mut self, value: i64, timestamp: DateTime<Utc>) {
        self.check_count += 1;
        self.last_check = Some(timestamp);
        self.last_value = Some(value);
        if value < 0 {
            self.error_count += 1;
        }
    }
}

/// Target definition together with its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetWithStatus {
    #[serde(flatten)]
    pub target: TargetDefinition,
    pub status: TargetStatus,
}

/// One reading produced by a scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleResult {
    pub target_id: TargetId,
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

impl SampleResult {
    /// Create a result stamped with the current time.
    pub fn new(target_id: TargetId, value: i64) -> Self {
        Self {
            target_id,
            value,
            timestamp: Utc::now(),
        }
    }

    /// Whether this reading carries the error signal.
    pub fn is_error(&self) -> bool {
        self.value < 0
    }
}

/// Snapshot of daemon-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub active_targets: usize,
    pub processed_messages: u64,
    pub uptime_seconds: f64,
    pub queue_size: usize,
    pub total_errors: u64,
}
