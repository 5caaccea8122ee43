// src/engine/event_handlers.rs

//! Attempt outcome handling for the executor.
//!
//! Kept free of IO so the retry arithmetic and the report construction can
//! be tested without running anything.

use std::time::Duration;

use serde::Deserialize;

use crate::dag::SchedulerStep;
use crate::engine::TaskOutcome;
use crate::engine::runtime::TaskReport;
use crate::types::TaskStatus;

/// Bounded retry with exponential backoff.
///
/// Attempt `n` (1-based) that fails is retried after
/// `initial_backoff * multiplier^(n-1)`, capped at `max_backoff`, as long as
/// fewer than `max_retries` retries have happened.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(with = "millis", rename = "initial_backoff_ms")]
    pub initial_backoff: Duration,
    pub multiplier: f64,
    #[serde(with = "millis", rename = "max_backoff_ms")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(de).map(Duration::from_millis)
    }
}

/// What the executor should do after one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    /// Sleep for the backoff (keeping the worker slot), then try again.
    Retry { backoff: Duration },
    /// Report the outcome to the scheduler.
    Finish,
}

/// Decide whether attempt `attempt` (1-based) is final.
pub fn decide_after_attempt(
    policy: &RetryPolicy,
    attempt: u32,
    outcome: &TaskOutcome,
) -> AttemptDecision {
    if outcome.is_success() || attempt > policy.max_retries {
        AttemptDecision::Finish
    } else {
        AttemptDecision::Retry {
            backoff: policy.backoff_for(attempt),
        }
    }
}

/// Reports for everything a scheduler step cancelled as a side effect.
pub fn cancellation_reports(step: &SchedulerStep, type_of: impl Fn(&str) -> String) -> Vec<TaskReport> {
    step.newly_cancelled
        .iter()
        .map(|id| TaskReport {
            id: id.clone(),
            task_type: type_of(id),
            status: TaskStatus::Cancelled,
            duration: None,
            attempts: 0,
            error: Some("dependency failed".to_string()),
        })
        .collect()
}
