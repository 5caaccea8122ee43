use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical task identifier type used throughout the crate.
pub type TaskId = String;

/// Discrete priority tier. Declaration order is ascending, so the derived
/// `Ord` gives `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Tiers from highest to lowest, the order in which the queue is scanned.
    pub const DESCENDING: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// Numeric score used by the adaptive priority model.
    pub fn score(self) -> i64 {
        match self {
            Priority::Critical => 100,
            Priority::High => 75,
            Priority::Medium => 50,
            Priority::Low => 25,
        }
    }

    /// Map an integer score back onto a tier.
    ///
    /// - `>= 90` → `Critical`
    /// - `>= 70` → `High`
    /// - `>= 40` → `Medium`
    /// - anything lower → `Low`
    pub fn from_score(score: i64) -> Self {
        if score >= 90 {
            Priority::Critical
        } else if score >= 70 {
            Priority::High
        } else if score >= 40 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    /// Bucket index, 0 for `Low` up to 3 for `Critical`.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl From<i64> for Priority {
    fn from(score: i64) -> Self {
        Priority::from_score(score)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => other.parse::<i64>().map(Priority::from_score).map_err(|_| {
                format!(
                    "invalid priority: {other} (expected critical, high, medium, low or an integer)"
                )
            }),
        }
    }
}

/// Lifecycle status of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// `Completed`, `Failed` and `Cancelled` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How the executor picks tasks to dispatch.
///
/// - `Concurrent`: any ready task, up to the pool size.
/// - `Pipeline`: at most one running task per dependency chain; different
///   chains overlap.
/// - `Hybrid`: wavefronts. Dispatch the ready frontier (up to the pool size),
///   wait for it, then dispatch the frontier it unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    Concurrent,
    Pipeline,
    Hybrid,
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Hybrid
    }
}

impl FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concurrent" => Ok(ExecutionStrategy::Concurrent),
            "pipeline" => Ok(ExecutionStrategy::Pipeline),
            "hybrid" | "wavefront" => Ok(ExecutionStrategy::Hybrid),
            other => Err(format!(
                "invalid strategy: {other} (expected \"concurrent\", \"pipeline\" or \"hybrid\")"
            )),
        }
    }
}

/// What a terminal failure means for the failed task's dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Queued transitive dependents become `Cancelled` without running.
    Cascade,
    /// The failure counts as resolved; dependents run independently.
    Continue,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Cascade
    }
}
