// src/dag/task_info.rs

//! Task model: the submission spec and the queued task record.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::types::{Priority, TaskId, TaskStatus};

/// What a caller hands to `submit`.
///
/// ```
/// use tierdag::dag::TaskSpec;
/// use tierdag::types::Priority;
///
/// let spec = TaskSpec::new("lint", "check")
///     .priority(Priority::High)
///     .after("fetch")
///     .meta("cmd", "cargo clippy");
/// assert!(spec.dependencies.contains("fetch"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub id: TaskId,
    pub task_type: String,
    pub priority: Priority,
    /// Exact integer score, when the caller gave one instead of a tier.
    pub score: Option<i64>,
    pub dependencies: BTreeSet<TaskId>,
    pub metadata: BTreeMap<String, String>,
}

impl TaskSpec {
    pub fn new(id: impl Into<TaskId>, task_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.into(),
            priority: Priority::default(),
            score: None,
            dependencies: BTreeSet::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self.score = None;
        self
    }

    /// Request an integer priority. The tier is derived with
    /// [`Priority::from_score`], but the adaptive model adjusts the exact
    /// score, so `72` with a fast-type penalty lands in `Medium`.
    pub fn score(mut self, score: i64) -> Self {
        self.priority = Priority::from_score(score);
        self.score = Some(score);
        self
    }

    /// Score fed to the adaptive model.
    pub fn requested_score(&self) -> i64 {
        self.score.unwrap_or_else(|| self.priority.score())
    }

    pub fn after(mut self, dep: impl Into<TaskId>) -> Self {
        self.dependencies.insert(dep.into());
        self
    }

    pub fn after_all<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A task as stored by the scheduler.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub task_type: String,
    /// Tier after the (optional) adaptive adjustment. Never recomputed.
    pub priority: Priority,
    pub dependencies: BTreeSet<TaskId>,
    pub metadata: BTreeMap<String, String>,
    pub status: TaskStatus,
    pub queued_at: Instant,
    /// Submission order; FIFO tie-break inside a tier.
    pub sequence: u64,
}

impl Task {
    pub fn from_spec(spec: TaskSpec, priority: Priority, sequence: u64) -> Self {
        Self {
            id: spec.id,
            task_type: spec.task_type,
            priority,
            dependencies: spec.dependencies,
            metadata: spec.metadata,
            status: TaskStatus::Queued,
            queued_at: Instant::now(),
            sequence,
        }
    }

    pub fn age(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// Staleness report for a queued task whose dependencies are not all met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleTask {
    pub id: TaskId,
    pub age: Duration,
    /// Dependencies not yet in the completed-set.
    pub unmet: Vec<TaskId>,
    /// Subset of `unmet` that was never submitted at all.
    pub never_submitted: Vec<TaskId>,
}
