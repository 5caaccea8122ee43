// src/dag/mod.rs

//! Dependency tracking and the pure scheduler state machine.
//!
//! - [`graph`] holds prerequisite edges, the completed-set and chain index.
//! - [`scheduler`] combines queue, graph, registry and adaptive model into
//!   one synchronous state machine.
//! - [`task_info`] provides the task model and submission spec.
//! - [`scheduler_step`] defines the result type for completion/failure steps.
//! - [`state_manager`] tracks per-id lifecycle status.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DependencyGraph;
pub use scheduler::{CoreScheduler, DequeueFilter, SchedulerConfig, SchedulerStatistics, Submission};
pub use scheduler_step::SchedulerStep;
pub use state_manager::{TaskEntry, TaskRegistry};
pub use task_info::{StaleTask, Task, TaskSpec};
