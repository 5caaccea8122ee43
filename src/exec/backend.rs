// src/exec/backend.rs

//! Pluggable task runner abstraction.
//!
//! The executor talks to a `TaskRunner` instead of spawning processes
//! itself. Production uses [`ProcessRunner`](super::ProcessRunner); tests
//! provide runners that script outcomes without touching the OS.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::Task;
use crate::engine::TaskOutcome;

/// Executes one attempt of a task.
///
/// Implementations must not panic on task failure; report
/// [`TaskOutcome::Failed`] instead. The executor measures wall time itself.
pub trait TaskRunner: Send + Sync + 'static {
    /// Run attempt number `attempt` (1-based) of `task`.
    fn run_task(&self, task: Task, attempt: u32) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>>;
}

impl<T: TaskRunner + ?Sized> TaskRunner for Arc<T> {
    fn run_task(&self, task: Task, attempt: u32) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        (**self).run_task(task, attempt)
    }
}
