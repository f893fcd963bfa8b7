//! Target registry: the three co-indexed maps behind the supervisor.
//!
//! Definitions, statuses and running tasks are always inserted and removed
//! together, so the three key sets stay identical.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::monitor::{TargetDefinition, TargetId, TargetStatus, TargetWithStatus};

/// Bookkeeping for one spawned scheduler.
#[derive(Debug)]
pub struct RunningTask {
    pub cancel: CancellationToken,
    pub handle: JoinHandle<()>,
}

impl RunningTask {
    /// Signal the scheduler to stop. Does not wait for it to exit.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// In-memory store of targets, their status and their tasks.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    definitions: HashMap<TargetId, TargetDefinition>,
    statuses: HashMap<TargetId, TargetStatus>,
    tasks: HashMap<TargetId, RunningTask>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &TargetId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Insert a target with a zeroed status and its running task.
    pub fn insert(&mut self, target: TargetDefinition, task: RunningTask) {
        let id = target.id;
        self.statuses.insert(id, TargetStatus::default());
        self.definitions.insert(id, target);
        self.tasks.insert(id, task);
    }

    /// Remove all three entries for `id`, returning the task if it existed.
    pub fn remove(&mut self, id: &TargetId) -> Option<RunningTask> {
        let task = self.tasks.remove(id)?;
        self.definitions.remove(id);
        self.statuses.remove(id);
        Some(task)
    }

    /// Apply a reading to the target's status. Returns `false` for unknown ids.
    pub fn record(&mut self, id: &TargetId, value: i64, timestamp: chrono::DateTime<chrono::Utc>) -> bool {
        match self.statuses.get_mut(id) {
            Some(status) => {
                status.record(value, timestamp);
                true
            }
            None => false,
        }
    }

    pub fn definition(&self, id: &TargetId) -> Option<&TargetDefinition> {
        self.definitions.get(id)
    }

    pub fn with_status(&self, id: &TargetId) -> Option<TargetWithStatus> {
        let target = self.definitions.get(id)?;
        Some(TargetWithStatus {
            target: target.clone(),
            status: self.statuses.get(id).cloned().unwrap_or_default(),
        })
    }

    pub fn all_with_status(&self) -> Vec<TargetWithStatus> {
        self.definitions
            .values()
            .map(|target| TargetWithStatus {
                target: target.clone(),
                status: self.statuses.get(&target.id).cloned().unwrap_or_default(),
            })
            .collect()
    }

    pub fn ids(&self) -> Vec<TargetId> {
        self.tasks.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether the three maps hold exactly the same ids.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.definitions.len() == self.tasks.len()
            && self.statuses.len() == self.tasks.len()
            && self
                .tasks
                .keys()
                .all(|id| self.definitions.contains_key(id) && self.statuses.contains_key(id))
    }
}
