// src/engine/adaptive.rs

//! Rolling per-type execution history used to bias priority at submission.
//!
//! This is a heuristic feedback loop, not an optimiser. Given a fixed
//! history, `compute_priority` always returns the same value.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// One completed attempt: positive seconds for success, negative for failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub task_type: String,
    pub signed_secs: f64,
}

impl ExecutionRecord {
    pub fn new(task_type: impl Into<String>, duration: Duration, success: bool) -> Self {
        let secs = duration.as_secs_f64();
        Self {
            task_type: task_type.into(),
            signed_secs: if success { secs } else { -secs },
        }
    }

    /// Sign bit, so a zero-length failure (`-0.0`) still counts.
    pub fn is_failure(&self) -> bool {
        self.signed_secs.is_sign_negative()
    }
}

/// Tunables for [`AdaptivePriorityModel`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Ring buffer capacity per task type.
    pub history_capacity: usize,
    /// How many of the most recent samples are inspected.
    pub window: usize,
    /// More failures than this inside the window triggers the boost.
    pub failure_threshold: usize,
    pub failure_boost: i64,
    /// Mean absolute duration (seconds) below which a type counts as fast.
    pub fast_task_secs: f64,
    pub fast_task_penalty: i64,
    pub min_priority: i64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            window: 10,
            failure_threshold: 5,
            failure_boost: 20,
            fast_task_secs: 10.0,
            fast_task_penalty: 5,
            min_priority: 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct AdaptivePriorityModel {
    config: AdaptiveConfig,
    history: HashMap<String, VecDeque<f64>>,
}

impl AdaptivePriorityModel {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            history: HashMap::new(),
        }
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// Append a signed sample for `task_type`, dropping the oldest sample
    /// once the ring buffer is full.
    pub fn record_completion(&mut self, task_type: &str, duration: Duration, success: bool) {
        self.record(ExecutionRecord::new(task_type, duration, success));
    }

    pub fn record(&mut self, record: ExecutionRecord) {
        let capacity = self.config.history_capacity.max(1);
        let samples = self
            .history
            .entry(record.task_type)
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        if samples.len() == capacity {
            samples.pop_front();
        }
        samples.push_back(record.signed_secs);
    }

    /// Bias `base` using the recent history of `task_type`.
    ///
    /// - more than `failure_threshold` failures in the last `window` samples:
    ///   `base + failure_boost`
    /// - otherwise, if the mean absolute duration of those samples is below
    ///   `fast_task_secs`: `base - fast_task_penalty`
    /// - the result never drops below `min_priority`
    pub fn compute_priority(&self, task_type: &str, base: i64) -> i64 {
        let cfg = &self.config;
        let recent: Vec<f64> = self
            .history
            .get(task_type)
            .map(|samples| samples.iter().rev().take(cfg.window).copied().collect())
            .unwrap_or_default();

        if recent.is_empty() {
            return base.max(cfg.min_priority);
        }

        let failures = recent.iter().filter(|s| s.is_sign_negative()).count();
        let adjusted = if failures > cfg.failure_threshold {
            debug!(task_type, failures, "flaky task type; boosting priority");
            base + cfg.failure_boost
        } else {
            let mean_abs = recent.iter().map(|s| s.abs()).sum::<f64>() / recent.len() as f64;
            if mean_abs < cfg.fast_task_secs {
                debug!(task_type, mean_abs, "fast task type; lowering priority");
                base - cfg.fast_task_penalty
            } else {
                base
            }
        };

        adjusted.max(cfg.min_priority)
    }

    /// Number of samples currently held for `task_type`.
    pub fn sample_count(&self, task_type: &str) -> usize {
        self.history.get(task_type).map_or(0, VecDeque::len)
    }
}
