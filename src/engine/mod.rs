// src/engine/mod.rs

//! Scheduling and execution engine.
//!
//! This module ties together:
//! - the tiered bounded queue ([`queue`])
//! - the adaptive priority model ([`adaptive`])
//! - the thread-safe scheduler handle that blocks dequeuers until work
//!   becomes ready ([`core`])
//! - retry / outcome handling for individual attempts ([`event_handlers`])
//! - the parallel executor and its strategies ([`runtime`])
//!
//! The pure state machine lives in [`crate::dag::CoreScheduler`]; everything
//! here is either a data structure it owns or the async shell around it.

/// Outcome of one task attempt as reported by a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TaskOutcome::Success => None,
            TaskOutcome::Failed(msg) => Some(msg),
        }
    }
}

pub mod adaptive;
pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use adaptive::{AdaptiveConfig, AdaptivePriorityModel, ExecutionRecord};
pub use core::{Next, TaskScheduler};
pub use event_handlers::{AttemptDecision, RetryPolicy, decide_after_attempt};
pub use queue::{EnqueueOutcome, QueueStats, TaskQueue};
pub use runtime::{
    ExecutorConfig, ExecutorHandle, ParallelExecutionResult, ParallelExecutor, TaskReport,
};
