// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dag::{DequeueFilter, Task};
use crate::exec::{AlwaysOpen, CheckpointCoordinator, CheckpointId, NoCheckpoints, ResourceGate, TaskRunner};
use crate::types::{ExecutionStrategy, TaskId, TaskStatus};

use super::core::{Next, TaskScheduler};
use super::event_handlers::{AttemptDecision, RetryPolicy, cancellation_reports, decide_after_attempt};
use super::TaskOutcome;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Worker pool size (wavefront width for `Hybrid`).
    pub workers: usize,
    pub strategy: ExecutionStrategy,
    pub retry: RetryPolicy,
    /// Roll back to the last checkpoint when a task fails terminally.
    pub rollback_on_failure: bool,
    /// How long an idle worker waits for work before re-checking.
    pub dequeue_timeout: Duration,
    /// How often a worker re-polls a closed resource gate.
    pub resource_poll_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            strategy: ExecutionStrategy::default(),
            retry: RetryPolicy::default(),
            rollback_on_failure: false,
            dequeue_timeout: Duration::from_millis(200),
            resource_poll_interval: Duration::from_millis(100),
        }
    }
}

/// Final record for one task touched by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub id: TaskId,
    pub task_type: String,
    pub status: TaskStatus,
    /// Wall time of the final attempt; `None` if the task never ran.
    pub duration: Option<Duration>,
    pub attempts: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParallelExecutionResult {
    pub reports: BTreeMap<TaskId, TaskReport>,
    /// Tasks still queued when the run stopped because nothing could become ready.
    pub stalled: Vec<TaskId>,
    /// Checkpoints captured during the run, in order.
    pub checkpoints: Vec<CheckpointId>,
    /// Checkpoints rolled back to, in order.
    pub rollbacks: Vec<CheckpointId>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ParallelExecutionResult {
    /// True iff no task failed or was cancelled and nothing stalled.
    pub fn success(&self) -> bool {
        self.stalled.is_empty()
            && !self.cancelled
            && self
                .reports
                .values()
                .all(|r| !matches!(r.status, TaskStatus::Failed | TaskStatus::Cancelled))
    }

    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.reports.get(id).map(|r| r.status)
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.reports.values().filter(|r| r.status == status).count()
    }

    fn absorb(&mut self, reports: Vec<TaskReport>) {
        for report in reports {
            self.reports.insert(report.id.clone(), report);
        }
    }
}

/// Cancels a running executor from another task.
///
/// In-flight tasks finish; nothing new is dispatched.
#[derive(Debug, Clone)]
pub struct ExecutorHandle {
    cancelled: Arc<AtomicBool>,
    scheduler: Arc<TaskScheduler>,
}

impl ExecutorHandle {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!("executor cancellation requested");
        }
        self.scheduler.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Shared state for one run, cloned into every worker.
struct RunContext<R: TaskRunner> {
    scheduler: Arc<TaskScheduler>,
    runner: Arc<R>,
    gate: Arc<dyn ResourceGate>,
    checkpoints: Arc<dyn CheckpointCoordinator>,
    config: ExecutorConfig,
    cancelled: Arc<AtomicBool>,
}

/// Drains a [`TaskScheduler`] through a [`TaskRunner`] with bounded
/// parallelism.
///
/// The executor never decides readiness itself; it only takes what the
/// scheduler hands out and reports outcomes back, so every strategy observes
/// the same dependency and cascade semantics.
pub struct ParallelExecutor<R: TaskRunner> {
    scheduler: Arc<TaskScheduler>,
    runner: Arc<R>,
    gate: Arc<dyn ResourceGate>,
    checkpoints: Arc<dyn CheckpointCoordinator>,
    config: ExecutorConfig,
    cancelled: Arc<AtomicBool>,
}

impl<R: TaskRunner> fmt::Debug for ParallelExecutor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("config", &self.config)
            .field("cancelled", &self.cancelled)
            .finish_non_exhaustive()
    }
}

impl<R: TaskRunner> ParallelExecutor<R> {
    pub fn new(scheduler: Arc<TaskScheduler>, runner: Arc<R>, config: ExecutorConfig) -> Self {
        Self {
            scheduler,
            runner,
            gate: Arc::new(AlwaysOpen),
            checkpoints: Arc::new(NoCheckpoints),
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ResourceGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Arc<dyn CheckpointCoordinator>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            cancelled: Arc::clone(&self.cancelled),
            scheduler: Arc::clone(&self.scheduler),
        }
    }

    /// Run until the queue drains, the remaining work stalls, or the run is
    /// cancelled.
    pub async fn run(self) -> ParallelExecutionResult {
        let started = Instant::now();
        let workers = self.config.workers.max(1);
        let strategy = self.config.strategy;
        info!(workers, ?strategy, queued = self.scheduler.size(), "executor started");

        let ctx = Arc::new(RunContext {
            scheduler: self.scheduler,
            runner: self.runner,
            gate: self.gate,
            checkpoints: self.checkpoints,
            config: self.config,
            cancelled: self.cancelled,
        });

        let mut result = match strategy {
            ExecutionStrategy::Concurrent => run_pool(&ctx, workers, DequeueFilter::Any).await,
            ExecutionStrategy::Pipeline => run_pool(&ctx, workers, DequeueFilter::OnePerChain).await,
            ExecutionStrategy::Hybrid => run_wavefronts(&ctx, workers).await,
        };

        result.cancelled = ctx.is_cancelled();
        if ctx.scheduler.is_stalled() && !result.cancelled {
            result.stalled = ctx.scheduler.queued_ids();
            for id in &result.stalled {
                warn!(task = %id, "task can never become ready");
            }
        }
        result.elapsed = started.elapsed();

        info!(
            success = result.success(),
            completed = result.count(TaskStatus::Completed),
            failed = result.count(TaskStatus::Failed),
            cancelled = result.count(TaskStatus::Cancelled),
            stalled = result.stalled.len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "executor finished"
        );
        result
    }
}

impl<R: TaskRunner> RunContext<R> {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Block (politely) while the resource gate is closed.
    ///
    /// Returns `false` if the run was cancelled while waiting.
    async fn wait_for_resources(&self) -> bool {
        let mut logged = false;
        while !self.gate.is_available() {
            if self.is_cancelled() {
                return false;
            }
            if !logged {
                debug!("resources unavailable; deferring dispatch");
                logged = true;
            }
            tokio::time::sleep(self.config.resource_poll_interval).await;
        }
        !self.is_cancelled()
    }

    fn capture(&self, label: &str) -> Option<CheckpointId> {
        match self.checkpoints.capture(label) {
            Ok(id) => {
                debug!(checkpoint = %id, label, "checkpoint captured");
                Some(id)
            }
            Err(err) => {
                warn!(label, error = %err, "checkpoint capture failed");
                None
            }
        }
    }

    fn rollback(&self, id: &CheckpointId, result: &mut ParallelExecutionResult) {
        if self.checkpoints.rollback(id) {
            info!(checkpoint = %id, "rolled back after task failure");
            result.rollbacks.push(id.clone());
        } else {
            warn!(checkpoint = %id, "rollback refused by coordinator");
        }
    }

    /// Run one attempt in its own task so a panicking runner counts as a
    /// failed attempt instead of taking the worker down.
    async fn attempt(&self, task: &Task, attempt: u32) -> TaskOutcome {
        let runner = Arc::clone(&self.runner);
        let task = task.clone();
        match tokio::spawn(async move { runner.run_task(task, attempt).await }).await {
            Ok(outcome) => outcome,
            Err(err) => TaskOutcome::Failed(format!("runner panicked: {err}")),
        }
    }

    /// Run a dispatched task to a terminal state, retrying per policy, and
    /// report the outcome (plus any cascade it caused).
    async fn execute(&self, task: Task) -> Vec<TaskReport> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(task = %task.id, attempt, priority = %task.priority, "running task");
            let started = Instant::now();
            let outcome = self.attempt(&task, attempt).await;
            let elapsed = started.elapsed();

            match decide_after_attempt(&self.config.retry, attempt, &outcome) {
                AttemptDecision::Retry { backoff } => {
                    warn!(
                        task = %task.id,
                        attempt,
                        error = outcome.error().unwrap_or_default(),
                        backoff_ms = backoff.as_millis() as u64,
                        "task attempt failed; retrying"
                    );
                    self.scheduler.record_execution(&task.task_type, elapsed, false);
                    tokio::time::sleep(backoff).await;
                }
                AttemptDecision::Finish => {
                    return self.finish(task, attempt, elapsed, outcome);
                }
            }
        }
    }

    fn finish(&self, task: Task, attempts: u32, elapsed: Duration, outcome: TaskOutcome) -> Vec<TaskReport> {
        let success = outcome.is_success();
        let error = outcome.error().map(str::to_string);
        if success {
            info!(task = %task.id, attempts, elapsed_ms = elapsed.as_millis() as u64, "task completed");
        } else {
            error!(task = %task.id, attempts, error = error.as_deref().unwrap_or_default(), "task failed");
        }

        let mut reports = vec![TaskReport {
            id: task.id.clone(),
            task_type: task.task_type.clone(),
            status: if success { TaskStatus::Completed } else { TaskStatus::Failed },
            duration: Some(elapsed),
            attempts,
            error: error.clone(),
        }];

        match self.scheduler.report_outcome(&task.id, success, elapsed, error) {
            Ok(step) => {
                for id in &step.newly_cancelled {
                    info!(task = %id, failed = %task.id, "cancelled: dependency failed");
                }
                reports.extend(cancellation_reports(&step, |id| {
                    self.scheduler
                        .entry_summary(id)
                        .map(|(ty, _)| ty)
                        .unwrap_or_default()
                }));
            }
            Err(err) => {
                warn!(task = %task.id, error = %err, "scheduler rejected task outcome");
            }
        }
        reports
    }
}

/// Concurrent / pipeline: N independent workers pulling from the scheduler.
async fn run_pool<R: TaskRunner>(
    ctx: &Arc<RunContext<R>>,
    workers: usize,
    filter: DequeueFilter,
) -> ParallelExecutionResult {
    let mut result = ParallelExecutionResult::default();
    let checkpoint = ctx.capture("run-start");
    result.checkpoints.extend(checkpoint.clone());

    let mut set = JoinSet::new();
    for worker in 0..workers {
        let ctx = Arc::clone(ctx);
        set.spawn(async move { worker_loop(ctx, worker, filter).await });
    }
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(reports) => result.absorb(reports),
            Err(err) => error!(error = %err, "worker task aborted"),
        }
    }

    let failed = result.count(TaskStatus::Failed) > 0;
    if failed && ctx.config.rollback_on_failure {
        if let Some(id) = &checkpoint {
            ctx.rollback(id, &mut result);
        }
    }
    result
}

async fn worker_loop<R: TaskRunner>(
    ctx: Arc<RunContext<R>>,
    worker: usize,
    filter: DequeueFilter,
) -> Vec<TaskReport> {
    let mut reports = Vec::new();
    debug!(worker, "worker started");
    loop {
        if !ctx.wait_for_resources().await {
            break;
        }
        match ctx.scheduler.next_task(filter, ctx.config.dequeue_timeout).await {
            Next::Ready(task) => {
                if ctx.is_cancelled() {
                    // Dispatched just as the run was cancelled; run it anyway
                    // rather than leaving it stuck in `Running`.
                    debug!(worker, task = %task.id, "running task picked up during cancellation");
                }
                reports.extend(ctx.execute(task).await);
            }
            Next::Drained | Next::Stalled => break,
            Next::Idle => {}
        }
        if ctx.is_cancelled() {
            break;
        }
    }
    debug!(worker, ran = reports.len(), "worker finished");
    reports
}

/// Hybrid: execute the ready frontier as a wavefront, wait for all of it,
/// checkpoint, repeat.
async fn run_wavefronts<R: TaskRunner>(
    ctx: &Arc<RunContext<R>>,
    width: usize,
) -> ParallelExecutionResult {
    let mut result = ParallelExecutionResult::default();
    let mut wave = 0usize;

    loop {
        if !ctx.wait_for_resources().await {
            break;
        }
        let frontier = match ctx
            .scheduler
            .next_batch(width, DequeueFilter::Any, ctx.config.dequeue_timeout)
            .await
        {
            Next::Ready(batch) => batch,
            Next::Drained | Next::Stalled => break,
            Next::Idle => {
                if ctx.is_cancelled() {
                    break;
                }
                continue;
            }
        };

        wave += 1;
        let checkpoint = ctx.capture(&format!("wavefront-{wave}"));
        result.checkpoints.extend(checkpoint.clone());
        info!(wave, size = frontier.len(), "dispatching wavefront");

        let mut set = JoinSet::new();
        for task in frontier {
            let ctx = Arc::clone(ctx);
            set.spawn(async move { ctx.execute(task).await });
        }

        let mut wave_failed = false;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(reports) => {
                    wave_failed |= reports.iter().any(|r| r.status == TaskStatus::Failed);
                    result.absorb(reports);
                }
                Err(err) => error!(error = %err, "wavefront task aborted"),
            }
        }

        if wave_failed && ctx.config.rollback_on_failure {
            if let Some(id) = &checkpoint {
                ctx.rollback(id, &mut result);
            }
        }
        if ctx.is_cancelled() {
            break;
        }
    }
    result
}
