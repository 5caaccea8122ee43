// src/exec/checkpoint.rs

//! Checkpoint capture / rollback collaborator.
//!
//! The executor only decides *when* to checkpoint (run start, or every
//! wavefront under the hybrid strategy) and when to roll back. What a
//! checkpoint contains is up to the coordinator.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::errors::{Result, TierdagError};

pub type CheckpointId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub label: String,
    pub created_at: SystemTime,
}

pub trait CheckpointCoordinator: Send + Sync {
    /// Capture a checkpoint and return its id.
    fn capture(&self, label: &str) -> Result<CheckpointId>;

    /// Restore the given checkpoint. `false` if it is unknown or the
    /// coordinator refused.
    fn rollback(&self, id: &CheckpointId) -> bool;
}

/// Coordinator that records nothing and never rolls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheckpoints;

impl CheckpointCoordinator for NoCheckpoints {
    fn capture(&self, label: &str) -> Result<CheckpointId> {
        Ok(label.to_string())
    }

    fn rollback(&self, _id: &CheckpointId) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct Journal {
    next: u64,
    checkpoints: Vec<Checkpoint>,
    rollbacks: Vec<CheckpointId>,
}

/// Keeps checkpoints in memory; a rollback discards every checkpoint taken
/// after the restored one.
#[derive(Debug, Default)]
pub struct InMemoryCheckpoints {
    journal: Mutex<Journal>,
}

impl InMemoryCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live checkpoints, oldest first.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.journal().checkpoints.clone()
    }

    /// Every successful rollback, in order.
    pub fn rollbacks(&self) -> Vec<CheckpointId> {
        self.journal().rollbacks.clone()
    }
}

impl CheckpointCoordinator for InMemoryCheckpoints {
    fn capture(&self, label: &str) -> Result<CheckpointId> {
        if label.is_empty() {
            return Err(TierdagError::Checkpoint("empty checkpoint label".to_string()));
        }
        let mut journal = self.journal();
        journal.next += 1;
        let id = format!("{}#{}", label, journal.next);
        journal.checkpoints.push(Checkpoint {
            id: id.clone(),
            label: label.to_string(),
            created_at: SystemTime::now(),
        });
        Ok(id)
    }

    fn rollback(&self, id: &CheckpointId) -> bool {
        let mut journal = self.journal();
        let Some(pos) = journal.checkpoints.iter().position(|c| &c.id == id) else {
            return false;
        };
        journal.checkpoints.truncate(pos + 1);
        journal.rollbacks.push(id.clone());
        true
    }
}
