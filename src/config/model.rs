// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::{SchedulerConfig, TaskSpec};
use crate::engine::{AdaptiveConfig, ExecutorConfig, RetryPolicy};
use crate::exec::CMD_KEY;
use crate::types::{ExecutionStrategy, FailurePolicy, Priority};

/// Plan file exactly as deserialized, before validation.
///
/// ```toml
/// [config]
/// workers = 2
/// strategy = "pipeline"
///
/// [config.retry]
/// max_retries = 1
///
/// [task.fetch]
/// cmd = "git fetch"
///
/// [task.build]
/// cmd = "cargo build"
/// type = "build"
/// priority = "high"
/// after = ["fetch"]
/// ```
///
/// All sections are optional; validation rejects a plan without tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ExecutorSection,

    /// All tasks from `[task.<id>]`, keyed by task id.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated plan. Construct it through `PlanFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ExecutorSection,
    pub task: BTreeMap<String, TaskConfig>,
    /// Task ids in dependency order (every task after its dependencies).
    order: Vec<String>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(
        config: ExecutorSection,
        task: BTreeMap<String, TaskConfig>,
        order: Vec<String>,
    ) -> Self {
        Self { config, task, order }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Task specs in dependency order, ready for submission.
    pub fn task_specs(&self) -> Vec<TaskSpec> {
        self.order
            .iter()
            .filter_map(|id| self.task.get(id).map(|task| task.to_spec(id)))
            .collect()
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_queue_size: self.config.max_queue_size,
            failure_policy: self.config.failure_policy,
            adaptive_priority: self.config.adaptive_priority,
            adaptive: self.config.adaptive.clone(),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            workers: self.config.workers,
            strategy: self.config.strategy,
            retry: self.config.retry.clone(),
            rollback_on_failure: self.config.rollback_on_failure,
            dequeue_timeout: Duration::from_millis(self.config.dequeue_timeout_ms),
            resource_poll_interval: Duration::from_millis(self.config.resource_poll_ms),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub workers: usize,
    pub max_queue_size: usize,
    pub strategy: ExecutionStrategy,
    pub failure_policy: FailurePolicy,
    pub rollback_on_failure: bool,
    pub adaptive_priority: bool,
    pub dequeue_timeout_ms: u64,
    pub resource_poll_ms: u64,

    /// `[config.retry]`.
    pub retry: RetryPolicy,

    /// `[config.adaptive]`.
    pub adaptive: AdaptiveConfig,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            workers: 4,
            max_queue_size: 1000,
            strategy: ExecutionStrategy::default(),
            failure_policy: FailurePolicy::default(),
            rollback_on_failure: false,
            adaptive_priority: true,
            dequeue_timeout_ms: 200,
            resource_poll_ms: 100,
            retry: RetryPolicy::default(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

/// `priority = "high"` or `priority = 80`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PriorityValue {
    Tier(Priority),
    Score(i64),
}

impl From<PriorityValue> for Priority {
    fn from(value: PriorityValue) -> Self {
        match value {
            PriorityValue::Tier(tier) => tier,
            PriorityValue::Score(score) => Priority::from_score(score),
        }
    }
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Task type for the adaptive model; defaults to the task id.
    #[serde(default, rename = "type")]
    pub task_type: Option<String>,

    #[serde(default)]
    pub priority: Option<PriorityValue>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TaskConfig {
    pub fn effective_type<'a>(&'a self, id: &'a str) -> &'a str {
        self.task_type.as_deref().unwrap_or(id)
    }

    pub fn effective_priority(&self) -> Priority {
        self.priority.map(Priority::from).unwrap_or_default()
    }

    pub fn to_spec(&self, id: &str) -> TaskSpec {
        let base = TaskSpec::new(id, self.effective_type(id));
        let base = match self.priority {
            Some(PriorityValue::Score(score)) => base.score(score),
            _ => base.priority(self.effective_priority()),
        };
        let mut spec = base.after_all(self.after.iter().cloned());
        spec.metadata = self.metadata.clone();
        spec.meta(CMD_KEY, self.cmd.clone())
    }
}
