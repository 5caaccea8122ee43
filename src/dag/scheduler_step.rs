// src/dag/scheduler_step.rs

//! Step result types for the scheduler.

use crate::types::TaskId;

/// Structured result of a completion or failure step.
///
/// Tests use it to make assertions about what a single call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Whether the call changed any state. `false` for repeated marks.
    pub changed: bool,
    /// Queued dependents that became ready as a result of this step.
    pub newly_ready: Vec<TaskId>,
    /// Dependents cancelled by a failure cascade (excluding the failed task).
    pub newly_cancelled: Vec<TaskId>,
}

impl SchedulerStep {
    pub fn unchanged() -> Self {
        Self::default()
    }
}
