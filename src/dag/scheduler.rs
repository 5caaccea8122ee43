use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{TaskEntry, TaskRegistry};
use crate::dag::task_info::{StaleTask, Task, TaskSpec};
use crate::engine::adaptive::{AdaptiveConfig, AdaptivePriorityModel};
use crate::engine::queue::{EnqueueOutcome, TaskQueue};
use crate::errors::{Result, TierdagError};
use crate::types::{FailurePolicy, Priority, TaskId, TaskStatus};

/// Static configuration of a scheduler instance.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Queue bound; enqueue beyond it evicts the lowest-tier task.
    pub max_queue_size: usize,
    pub failure_policy: FailurePolicy,
    /// Adjust each submission's tier once using the adaptive model.
    pub adaptive_priority: bool,
    pub adaptive: AdaptiveConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            failure_policy: FailurePolicy::default(),
            adaptive_priority: true,
            adaptive: AdaptiveConfig::default(),
        }
    }
}

/// Which ready tasks a dequeue may hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DequeueFilter {
    /// Any ready task.
    #[default]
    Any,
    /// Skip tasks whose dependency chain already has a running task.
    OnePerChain,
}

/// What happened to a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Tier the task was queued with, after adaptive adjustment.
    pub priority: Priority,
    /// Task evicted to make room, if the queue was full.
    pub evicted: Option<TaskId>,
    /// The task was cancelled on arrival because a dependency already failed.
    pub cancelled_on_arrival: bool,
}

/// Snapshot returned by `statistics()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStatistics {
    pub queued: usize,
    /// Indexed by `Priority as usize` (`Low` = 0 … `Critical` = 3).
    pub queued_by_tier: [usize; 4],
    pub running_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,
    pub dropped_count: u64,
    pub dequeued_count: u64,
    /// How many times blocked dequeuers were signalled.
    pub wakeups: u64,
}

impl SchedulerStatistics {
    pub fn queued_in(&self, tier: Priority) -> usize {
        self.queued_by_tier[tier.index()]
    }
}

/// Pure scheduler state: queue, dependency graph, lifecycle registry and
/// adaptive model, with no locks, channels or Tokio types.
///
/// `engine::TaskScheduler` wraps it in a single mutex so that every
/// operation here is one critical section. That is what makes a completion
/// join the completed-set and re-evaluate dependents atomically.
#[derive(Debug)]
pub struct CoreScheduler {
    config: SchedulerConfig,
    queue: TaskQueue,
    graph: DependencyGraph,
    registry: TaskRegistry,
    model: AdaptivePriorityModel,
    /// Running task id → chain id, for `DequeueFilter::OnePerChain`.
    running_chains: HashMap<TaskId, TaskId>,
    busy_chains: HashSet<TaskId>,
    next_sequence: u64,
    wakeups: u64,
}

impl CoreScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            queue: TaskQueue::new(config.max_queue_size),
            graph: DependencyGraph::new(config.failure_policy),
            registry: TaskRegistry::new(),
            model: AdaptivePriorityModel::new(config.adaptive.clone()),
            running_chains: HashMap::new(),
            busy_chains: HashSet::new(),
            next_sequence: 0,
            wakeups: 0,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn model(&self) -> &AdaptivePriorityModel {
        &self.model
    }

    /// Validate and queue a new task.
    ///
    /// Rejected synchronously (never queued):
    /// - a dependency on its own id,
    /// - an id this scheduler has already seen, including external
    ///   prerequisites already marked completed or failed,
    /// - dependencies that would close a cycle.
    pub fn submit(&mut self, spec: TaskSpec) -> Result<Submission> {
        if spec.dependencies.contains(&spec.id) {
            return Err(TierdagError::SelfDependency(spec.id));
        }
        if self.registry.contains(&spec.id)
            || self.graph.is_completed(&spec.id)
            || self.graph.is_failed(&spec.id)
        {
            return Err(TierdagError::DuplicateTask(spec.id));
        }

        let deps: Vec<TaskId> = spec.dependencies.iter().cloned().collect();
        if let Some(path) = self.graph.would_close_cycle(&spec.id, &deps) {
            return Err(TierdagError::CycleDetected(path));
        }

        let priority = if self.config.adaptive_priority {
            let score = self
                .model
                .compute_priority(&spec.task_type, spec.requested_score());
            Priority::from_score(score)
        } else {
            spec.priority
        };
        if priority != spec.priority {
            debug!(
                task = %spec.id,
                requested = %spec.priority,
                adjusted = %priority,
                "adaptive model adjusted tier"
            );
        }

        self.registry
            .insert_queued(&spec.id, &spec.task_type, priority)?;
        self.graph.register(&spec.id, deps);

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let task = Task::from_spec(spec, priority, sequence);

        if self.graph.policy() == FailurePolicy::Cascade
            && task.dependencies.iter().any(|d| self.is_dead_end(d))
        {
            warn!(task = %task.id, "dependency failed or cancelled; cancelling on arrival");
            self.registry.transition(&task.id, TaskStatus::Cancelled)?;
            return Ok(Submission {
                priority,
                evicted: None,
                cancelled_on_arrival: true,
            });
        }

        debug!(task = %task.id, tier = %priority, deps = task.dependencies.len(), "task queued");
        let evicted = match self.queue.enqueue(task) {
            EnqueueOutcome::InsertedWithEviction(dropped) => {
                self.registry.transition(&dropped.id, TaskStatus::Cancelled)?;
                Some(dropped.id)
            }
            EnqueueOutcome::Inserted | EnqueueOutcome::Rejected => None,
        };

        Ok(Submission {
            priority,
            evicted,
            cancelled_on_arrival: false,
        })
    }

    /// A dependency that can no longer complete.
    fn is_dead_end(&self, id: &str) -> bool {
        self.graph.is_failed(id) || self.registry.status_of(id) == Some(TaskStatus::Cancelled)
    }

    /// Take the highest-tier ready task allowed by `filter` and mark it
    /// `Running`.
    pub fn try_dequeue(&mut self, filter: DequeueFilter) -> Option<Task> {
        let graph = &self.graph;
        let busy = &self.busy_chains;
        let mut task = self.queue.pop_first_matching(|task| {
            graph.is_ready(task)
                && (filter == DequeueFilter::Any || !busy.contains(&graph.chain_of(&task.id)))
        })?;

        task.status = TaskStatus::Running;
        if let Err(err) = self.registry.transition(&task.id, TaskStatus::Running) {
            warn!(task = %task.id, error = %err, "dequeued task had unexpected status");
        }

        if filter == DequeueFilter::OnePerChain {
            let chain = self.graph.chain_of(&task.id);
            self.busy_chains.insert(chain.clone());
            self.running_chains.insert(task.id.clone(), chain);
        }

        info!(task = %task.id, tier = %task.priority, "task dispatched");
        Some(task)
    }

    /// Take up to `limit` ready tasks in dispatch order.
    pub fn take_ready(&mut self, limit: usize, filter: DequeueFilter) -> Vec<Task> {
        let mut out = Vec::new();
        while out.len() < limit {
            match self.try_dequeue(filter) {
                Some(task) => out.push(task),
                None => break,
            }
        }
        out
    }

    /// Whether some queued task could be dequeued right now.
    pub fn has_ready(&self, filter: DequeueFilter) -> bool {
        self.queue.iter().any(|task| {
            self.graph.is_ready(task)
                && (filter == DequeueFilter::Any
                    || !self.busy_chains.contains(&self.graph.chain_of(&task.id)))
        })
    }

    /// Record one execution sample without changing any task's status.
    pub fn record_execution(&mut self, task_type: &str, duration: Duration, success: bool) {
        self.model.record_completion(task_type, duration, success);
    }

    /// Mark `id` completed.
    ///
    /// - running task: becomes `Completed` and joins the completed-set
    /// - already terminal: no-op (`changed == false`)
    /// - unknown id: treated as an external prerequisite and added to the
    ///   completed-set
    /// - still queued: `InvalidTransition`
    pub fn mark_completed(&mut self, id: &str) -> Result<SchedulerStep> {
        match self.registry.status_of(id) {
            Some(TaskStatus::Running) => {
                self.registry.transition(id, TaskStatus::Completed)?;
            }
            Some(status) if status.is_terminal() => return Ok(SchedulerStep::unchanged()),
            Some(status) => {
                return Err(TierdagError::InvalidTransition {
                    task: id.to_string(),
                    from: status.to_string(),
                    to: TaskStatus::Completed.to_string(),
                });
            }
            None => {
                debug!(task = %id, "completing external prerequisite");
            }
        }

        if !self.graph.mark_completed(id) {
            return Ok(SchedulerStep::unchanged());
        }
        self.release_chain(id);

        Ok(SchedulerStep {
            changed: true,
            newly_ready: self.ready_dependents(id),
            newly_cancelled: Vec::new(),
        })
    }

    /// Mark `id` terminally failed and apply the failure policy.
    ///
    /// Under `FailurePolicy::Cascade` every queued transitive dependent is
    /// removed from the queue and becomes `Cancelled` without dispatch.
    pub fn mark_failed(&mut self, id: &str) -> Result<SchedulerStep> {
        match self.registry.status_of(id) {
            Some(TaskStatus::Running) => {
                self.registry.transition(id, TaskStatus::Failed)?;
            }
            Some(status) if status.is_terminal() => return Ok(SchedulerStep::unchanged()),
            Some(status) => {
                return Err(TierdagError::InvalidTransition {
                    task: id.to_string(),
                    from: status.to_string(),
                    to: TaskStatus::Failed.to_string(),
                });
            }
            None => {
                debug!(task = %id, "failing external prerequisite");
            }
        }

        if !self.graph.mark_failed(id) {
            return Ok(SchedulerStep::unchanged());
        }
        self.release_chain(id);

        match self.graph.policy() {
            FailurePolicy::Cascade => {
                let cancelled = self.cancel_queued(self.graph.transitive_dependents(id));
                if !cancelled.is_empty() {
                    warn!(
                        task = %id,
                        cancelled = ?cancelled,
                        "task failed; cancelled dependents"
                    );
                }
                Ok(SchedulerStep {
                    changed: true,
                    newly_ready: Vec::new(),
                    newly_cancelled: cancelled,
                })
            }
            FailurePolicy::Continue => Ok(SchedulerStep {
                changed: true,
                newly_ready: self.ready_dependents(id),
                newly_cancelled: Vec::new(),
            }),
        }
    }

    /// Record the outcome reported by the task runner for a running task.
    pub fn report_result(
        &mut self,
        id: &str,
        success: bool,
        duration: Duration,
        error: Option<String>,
    ) -> Result<SchedulerStep> {
        let entry = self
            .registry
            .get(id)
            .ok_or_else(|| TierdagError::TaskNotFound(id.to_string()))?;
        if entry.status != TaskStatus::Running {
            return Err(TierdagError::InvalidTransition {
                task: id.to_string(),
                from: entry.status.to_string(),
                to: if success {
                    TaskStatus::Completed.to_string()
                } else {
                    TaskStatus::Failed.to_string()
                },
            });
        }

        let task_type = entry.task_type.clone();
        self.model.record_completion(&task_type, duration, success);
        self.registry.record_outcome(id, duration, error);

        if success {
            self.mark_completed(id)
        } else {
            self.mark_failed(id)
        }
    }

    /// Cancel a still-queued task. Running and terminal tasks are untouched.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.queue.remove(id).is_none() {
            return false;
        }
        if let Err(err) = self.registry.transition(id, TaskStatus::Cancelled) {
            warn!(task = %id, error = %err, "removed task had unexpected status");
        }
        info!(task = %id, "queued task cancelled");
        true
    }

    /// Cancel a queued task together with its queued transitive dependents.
    /// Returns every id cancelled, `id` first; empty if `id` was not queued.
    pub fn remove_cascade(&mut self, id: &str) -> Vec<TaskId> {
        if !self.remove(id) {
            return Vec::new();
        }
        let mut cancelled = vec![id.to_string()];
        cancelled.extend(self.cancel_queued(self.graph.transitive_dependents(id)));
        cancelled
    }

    fn cancel_queued(&mut self, ids: Vec<TaskId>) -> Vec<TaskId> {
        ids.into_iter()
            .filter(|dependent| {
                if self.queue.remove(dependent).is_none() {
                    return false;
                }
                match self.registry.transition(dependent, TaskStatus::Cancelled) {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(task = %dependent, error = %err, "could not cancel dependent");
                        false
                    }
                }
            })
            .collect()
    }

    fn release_chain(&mut self, id: &str) {
        if let Some(chain) = self.running_chains.remove(id) {
            self.busy_chains.remove(&chain);
        }
    }

    fn ready_dependents(&self, id: &str) -> Vec<TaskId> {
        self.graph
            .dependents_of(id)
            .iter()
            .filter(|d| self.queue.get(d).is_some_and(|t| self.graph.is_ready(t)))
            .cloned()
            .collect()
    }

    /// Queued tasks at least `min_age` old whose dependencies are not all met.
    pub fn stale_tasks(&self, min_age: Duration) -> Vec<StaleTask> {
        self.queue
            .iter()
            .filter(|task| task.age() >= min_age)
            .filter_map(|task| {
                let unmet = self.graph.unmet_dependencies(task);
                if unmet.is_empty() {
                    return None;
                }
                let never_submitted = unmet
                    .iter()
                    .filter(|dep| !self.graph.is_submitted(dep))
                    .cloned()
                    .collect();
                Some(StaleTask {
                    id: task.id.clone(),
                    age: task.age(),
                    unmet,
                    never_submitted,
                })
            })
            .collect()
    }

    pub fn peek(&self) -> Option<&Task> {
        self.queue.peek()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_ids(&self) -> Vec<TaskId> {
        self.queue.iter().map(|t| t.id.clone()).collect()
    }

    pub fn running_count(&self) -> usize {
        self.registry.count(TaskStatus::Running)
    }

    /// Nothing queued and nothing running.
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.running_count() == 0
    }

    /// Work is queued but nothing runs and nothing can start: only an
    /// external completion could unblock it.
    pub fn is_stalled(&self) -> bool {
        !self.queue.is_empty() && self.running_count() == 0 && !self.has_ready(DequeueFilter::Any)
    }

    pub fn task_status(&self, id: &str) -> Option<TaskStatus> {
        self.registry.status_of(id)
    }

    pub fn task_entry(&self, id: &str) -> Option<&TaskEntry> {
        self.registry.get(id)
    }

    pub fn note_wakeup(&mut self) {
        self.wakeups += 1;
    }

    pub fn statistics(&self) -> SchedulerStatistics {
        let q = self.queue.stats();
        SchedulerStatistics {
            queued: q.queued,
            queued_by_tier: q.queued_by_tier,
            running_count: self.registry.count(TaskStatus::Running),
            completed_count: self.registry.count(TaskStatus::Completed),
            failed_count: self.registry.count(TaskStatus::Failed),
            cancelled_count: self.registry.count(TaskStatus::Cancelled),
            dropped_count: q.dropped,
            dequeued_count: q.dequeued,
            wakeups: self.wakeups,
        }
    }
}
