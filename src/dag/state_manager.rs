// src/dag/state_manager.rs

//! Lifecycle bookkeeping for every id a scheduler instance has seen.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{Result, TierdagError};
use crate::types::{Priority, TaskId, TaskStatus};

/// Per-task lifecycle entry. Outlives the task's stay in the queue.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub task_type: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub last_duration: Option<Duration>,
    pub last_error: Option<String>,
}

/// Registry of task statuses.
///
/// Ids are never removed, which is what makes them unique for the lifetime
/// of the scheduler: queued, running and terminal tasks all stay known.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: HashMap<TaskId, TaskEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TaskEntry> {
        self.entries.get(id)
    }

    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.entries.get(id).map(|e| e.status)
    }

    /// Insert a freshly submitted task as `Queued`.
    pub fn insert_queued(&mut self, id: &str, task_type: &str, priority: Priority) -> Result<()> {
        if self.entries.contains_key(id) {
            return Err(TierdagError::DuplicateTask(id.to_string()));
        }
        self.entries.insert(
            id.to_string(),
            TaskEntry {
                task_type: task_type.to_string(),
                priority,
                status: TaskStatus::Queued,
                last_duration: None,
                last_error: None,
            },
        );
        Ok(())
    }

    /// Move a task to `to`, enforcing the lifecycle:
    ///
    /// - `Queued → Running | Cancelled`
    /// - `Running → Completed | Failed`
    ///
    /// Terminal states are immutable. Re-marking a terminal task returns
    /// `Ok(false)` and changes nothing.
    pub fn transition(&mut self, id: &str, to: TaskStatus) -> Result<bool> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| TierdagError::TaskNotFound(id.to_string()))?;

        if entry.status.is_terminal() {
            debug!(task = %id, from = %entry.status, to = %to, "task already terminal; ignoring transition");
            return Ok(false);
        }

        let allowed = matches!(
            (entry.status, to),
            (TaskStatus::Queued, TaskStatus::Running)
                | (TaskStatus::Queued, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        );

        if !allowed {
            warn!(task = %id, from = %entry.status, to = %to, "rejected status transition");
            return Err(TierdagError::InvalidTransition {
                task: id.to_string(),
                from: entry.status.to_string(),
                to: to.to_string(),
            });
        }

        entry.status = to;
        Ok(true)
    }

    pub fn record_outcome(&mut self, id: &str, duration: Duration, error: Option<String>) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.last_duration = Some(duration);
            entry.last_error = error;
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }
}
