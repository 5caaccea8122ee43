// src/exec/mod.rs

//! Execution collaborators.
//!
//! - [`backend`] defines the `TaskRunner` trait the executor dispatches to.
//! - [`task_runner`] runs plan-file tasks as shell commands.
//! - [`gate`] is the resource availability check consulted before dispatch.
//! - [`checkpoint`] captures and restores checkpoints around wavefronts.

pub mod backend;
pub mod checkpoint;
pub mod gate;
pub mod task_runner;

pub use backend::TaskRunner;
pub use checkpoint::{Checkpoint, CheckpointCoordinator, CheckpointId, InMemoryCheckpoints, NoCheckpoints};
pub use gate::{AlwaysOpen, ResourceGate};
pub use task_runner::{CMD_KEY, ProcessRunner};
