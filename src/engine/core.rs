// src/engine/core.rs

//! Thread-safe scheduler handle.
//!
//! All bookkeeping goes through one `Mutex<CoreScheduler>`; a single
//! `Notify` plays the condition variable. The lock is only ever held for the
//! duration of one `CoreScheduler` call and never across an `.await`.
//!
//! Waiters register interest (`Notified::enable`) *before* inspecting the
//! queue under the lock, so a completion landing between the check and the
//! wait still wakes them.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::dag::{
    CoreScheduler, DequeueFilter, SchedulerConfig, SchedulerStatistics, SchedulerStep,
    StaleTask, Submission, Task, TaskSpec,
};
use crate::errors::Result;
use crate::types::{TaskId, TaskStatus};

/// Outcome of a wait for dispatchable work.
#[derive(Debug)]
pub enum Next<T> {
    /// Work was taken from the queue and marked `Running`.
    Ready(T),
    /// Nothing queued and nothing running.
    Drained,
    /// Work is queued, nothing runs, and nothing is ready.
    Stalled,
    /// The wait ended (state change or timeout) without dispatchable work.
    Idle,
}

#[derive(Debug)]
pub struct TaskScheduler {
    state: Mutex<CoreScheduler>,
    changed: Notify,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            state: Mutex::new(CoreScheduler::new(config)),
            changed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoreScheduler> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake every blocked dequeuer once. Must be called with the lock held
    /// so the wakeup counter matches the state change it announces.
    fn signal(&self, core: &mut CoreScheduler) {
        core.note_wakeup();
        self.changed.notify_waiters();
    }

    /// Wake all waiters without a state change (used on cancellation).
    pub fn notify_all(&self) {
        self.changed.notify_waiters();
    }

    /// Submit a task. Validation errors are returned synchronously and the
    /// task never enters the queue.
    pub fn submit(&self, spec: TaskSpec) -> Result<Submission> {
        let mut core = self.lock();
        let submission = core.submit(spec)?;
        self.signal(&mut core);
        Ok(submission)
    }

    /// `submit` reduced to accepted / rejected; rejections are logged.
    pub fn try_submit(&self, spec: TaskSpec) -> bool {
        let id = spec.id.clone();
        match self.submit(spec) {
            Ok(_) => true,
            Err(err) => {
                warn!(task = %id, error = %err, "submission rejected");
                false
            }
        }
    }

    /// Non-blocking: highest-tier ready task, marked `Running`.
    pub fn try_dequeue(&self) -> Option<Task> {
        self.lock().try_dequeue(DequeueFilter::Any)
    }

    /// Wait up to `timeout` for a ready task.
    ///
    /// Scans tiers from highest to lowest, FIFO within a tier, and returns
    /// the first task whose dependencies are all complete. Returns `None`
    /// when the timeout elapses first.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Task> {
        self.dequeue_matching(DequeueFilter::Any, timeout).await
    }

    pub async fn dequeue_matching(&self, filter: DequeueFilter, timeout: Duration) -> Option<Task> {
        self.wait_for(timeout, |core| core.try_dequeue(filter)).await
    }

    /// Wait up to `timeout` for ready work, then take up to `limit` ready
    /// tasks in dispatch order. Empty on timeout.
    pub async fn dequeue_batch(&self, limit: usize, timeout: Duration) -> Vec<Task> {
        self.wait_for(timeout, |core| {
            let batch = core.take_ready(limit, DequeueFilter::Any);
            if batch.is_empty() { None } else { Some(batch) }
        })
        .await
        .unwrap_or_default()
    }

    async fn wait_for<T, F>(&self, timeout: Duration, mut take: F) -> Option<T>
    where
        F: FnMut(&mut CoreScheduler) -> Option<T>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next = take(&mut *self.lock());
            if next.is_some() {
                return next;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Wait for one dispatchable task, returning early on any state change.
    ///
    /// Unlike [`dequeue`](Self::dequeue), this reports `Drained` / `Stalled`
    /// (checked under the same lock as the dequeue attempt) and returns
    /// `Idle` after the first wakeup, so worker loops can re-check
    /// cancellation and resource availability.
    pub async fn next_task(&self, filter: DequeueFilter, timeout: Duration) -> Next<Task> {
        self.next_with(timeout, |core| core.try_dequeue(filter)).await
    }

    /// Like [`next_task`](Self::next_task) but takes up to `limit` ready
    /// tasks at once: the current wavefront.
    pub async fn next_batch(
        &self,
        limit: usize,
        filter: DequeueFilter,
        timeout: Duration,
    ) -> Next<Vec<Task>> {
        self.next_with(timeout, |core| {
            let batch = core.take_ready(limit, filter);
            if batch.is_empty() { None } else { Some(batch) }
        })
        .await
    }

    async fn next_with<T, F>(&self, timeout: Duration, mut take: F) -> Next<T>
    where
        F: FnMut(&mut CoreScheduler) -> Option<T>,
    {
        let notified = self.changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let immediate = {
            let mut core = self.lock();
            match take(&mut *core) {
                Some(work) => Next::Ready(work),
                None if core.is_drained() => Next::Drained,
                None if core.is_stalled() => Next::Stalled,
                None => Next::Idle,
            }
        };
        if !matches!(immediate, Next::Idle) {
            return immediate;
        }

        if tokio::time::timeout(timeout, notified).await.is_err() {
            debug!("wait for dispatchable work timed out");
        }
        Next::Idle
    }

    /// Idempotent. Wakes waiters only when the call changed state.
    pub fn mark_completed(&self, id: &str) -> Result<SchedulerStep> {
        let mut core = self.lock();
        let step = core.mark_completed(id)?;
        if step.changed {
            self.signal(&mut core);
        }
        Ok(step)
    }

    /// Terminal failure with the configured cascade.
    pub fn mark_failed(&self, id: &str) -> Result<SchedulerStep> {
        let mut core = self.lock();
        let step = core.mark_failed(id)?;
        if step.changed {
            self.signal(&mut core);
        }
        Ok(step)
    }

    /// Report a runner outcome for a running task.
    ///
    /// Records an execution sample (signed by `success`) and marks the task
    /// `Completed` or `Failed`. Negative or non-finite durations count as 0.
    pub fn report_result(
        &self,
        id: &str,
        success: bool,
        duration_secs: f64,
        error: Option<String>,
    ) -> Result<SchedulerStep> {
        let duration = Duration::try_from_secs_f64(duration_secs.max(0.0)).unwrap_or_default();
        self.report_outcome(id, success, duration, error)
    }

    pub fn report_outcome(
        &self,
        id: &str,
        success: bool,
        duration: Duration,
        error: Option<String>,
    ) -> Result<SchedulerStep> {
        let mut core = self.lock();
        let step = core.report_result(id, success, duration, error)?;
        if step.changed {
            self.signal(&mut core);
        }
        Ok(step)
    }

    /// Record one execution sample (e.g. a failed attempt that will be retried).
    pub fn record_execution(&self, task_type: &str, duration: Duration, success: bool) {
        self.lock().record_execution(task_type, duration, success);
    }

    /// Priority the adaptive model would give `task_type` for `base`.
    pub fn compute_priority(&self, task_type: &str, base: i64) -> i64 {
        self.lock().model().compute_priority(task_type, base)
    }

    /// Execution samples held for `task_type`.
    pub fn sample_count(&self, task_type: &str) -> usize {
        self.lock().model().sample_count(task_type)
    }

    /// Cancel a queued, undispatched task. `false` if it is running, terminal
    /// or unknown.
    pub fn remove(&self, id: &str) -> bool {
        let mut core = self.lock();
        let removed = core.remove(id);
        if removed {
            self.signal(&mut core);
        }
        removed
    }

    /// Cancel a queued task and its queued transitive dependents.
    pub fn remove_cascade(&self, id: &str) -> Vec<TaskId> {
        let mut core = self.lock();
        let cancelled = core.remove_cascade(id);
        if !cancelled.is_empty() {
            self.signal(&mut core);
        }
        cancelled
    }

    pub fn peek(&self) -> Option<Task> {
        self.lock().peek().cloned()
    }

    pub fn size(&self) -> usize {
        self.lock().queued_len()
    }

    pub fn queued_ids(&self) -> Vec<TaskId> {
        self.lock().queued_ids()
    }

    pub fn statistics(&self) -> SchedulerStatistics {
        self.lock().statistics()
    }

    pub fn task_status(&self, id: &str) -> Option<TaskStatus> {
        self.lock().task_status(id)
    }

    /// Whether `id` is in the completed-set (submitted or external).
    pub fn is_completed(&self, id: &str) -> bool {
        self.lock().graph().is_completed(id)
    }

    pub fn stale_tasks(&self, min_age: Duration) -> Vec<StaleTask> {
        self.lock().stale_tasks(min_age)
    }

    pub fn is_drained(&self) -> bool {
        self.lock().is_drained()
    }

    pub fn is_stalled(&self) -> bool {
        self.lock().is_stalled()
    }

    /// Task type and last error for reporting.
    pub(crate) fn entry_summary(&self, id: &str) -> Option<(String, Option<String>)> {
        self.lock()
            .task_entry(id)
            .map(|e| (e.task_type.clone(), e.last_error.clone()))
    }
}
