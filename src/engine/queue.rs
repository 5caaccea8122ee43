// src/engine/queue.rs

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::dag::Task;
use crate::types::{Priority, TaskId};

/// Result of [`TaskQueue::enqueue`].
#[derive(Debug)]
pub enum EnqueueOutcome {
    /// Inserted with room to spare.
    Inserted,
    /// Inserted after evicting this task to stay within capacity.
    InsertedWithEviction(Task),
    /// The id is already queued; nothing changed.
    Rejected,
}

impl EnqueueOutcome {
    pub fn accepted(&self) -> bool {
        !matches!(self, EnqueueOutcome::Rejected)
    }
}

/// Read-only counters of a [`TaskQueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub queued: usize,
    pub dequeued: u64,
    pub dropped: u64,
    /// Indexed by `Priority as usize` (`Low` = 0 … `Critical` = 3).
    pub queued_by_tier: [usize; 4],
}

impl QueueStats {
    pub fn queued_in(&self, tier: Priority) -> usize {
        self.queued_by_tier[tier.index()]
    }
}

/// Bounded, tiered bucket queue.
///
/// Semantics:
/// - One FIFO bucket per tier. Buckets hold sequence numbers; the task
///   bodies live in a slab keyed by sequence number, and an id index maps
///   each queued id to its slot.
/// - Removing by id only touches the slab and the index. The sequence number
///   stays behind as a tombstone that scans skip; tombstones at the front of
///   a bucket are popped eagerly and the bucket is compacted when tombstones
///   dominate it.
/// - At capacity, `enqueue` first evicts the earliest-queued task of the
///   lowest non-empty tier, so the size never exceeds `capacity`.
///
/// The queue knows nothing about dependencies: `pop_first_matching` takes
/// the readiness predicate from the caller.
#[derive(Debug)]
pub struct TaskQueue {
    capacity: usize,
    buckets: [VecDeque<u64>; 4],
    live: [usize; 4],
    slots: HashMap<u64, Task>,
    index: HashMap<TaskId, (Priority, u64)>,
    dequeued: u64,
    dropped: u64,
}

impl TaskQueue {
    /// Create a queue holding at most `capacity` tasks (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buckets: Default::default(),
            live: [0; 4],
            slots: HashMap::new(),
            index: HashMap::new(),
            dequeued: 0,
            dropped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        let (_, seq) = self.index.get(id)?;
        self.slots.get(seq)
    }

    /// Insert `task`, evicting the lowest-tier task first if the queue is full.
    pub fn enqueue(&mut self, task: Task) -> EnqueueOutcome {
        if self.index.contains_key(&task.id) {
            debug!(task = %task.id, "enqueue of already-queued id; rejecting");
            return EnqueueOutcome::Rejected;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict_lowest()
        } else {
            None
        };

        let tier = task.priority;
        let seq = task.sequence;
        self.index.insert(task.id.clone(), (tier, seq));
        self.slots.insert(seq, task);
        self.buckets[tier.index()].push_back(seq);
        self.live[tier.index()] += 1;

        match evicted {
            Some(task) => EnqueueOutcome::InsertedWithEviction(task),
            None => EnqueueOutcome::Inserted,
        }
    }

    fn evict_lowest(&mut self) -> Option<Task> {
        let tier = Priority::DESCENDING
            .iter()
            .rev()
            .copied()
            .find(|t| self.live[t.index()] > 0)?;

        let bucket = &mut self.buckets[tier.index()];
        while let Some(seq) = bucket.pop_front() {
            if let Some(task) = self.slots.remove(&seq) {
                self.index.remove(&task.id);
                self.live[tier.index()] -= 1;
                self.dropped += 1;
                warn!(
                    task = %task.id,
                    tier = %tier,
                    capacity = self.capacity,
                    "queue at capacity; evicting lowest-tier task"
                );
                return Some(task);
            }
        }
        None
    }

    /// Remove and return the first task, scanning tiers from highest to lowest
    /// and FIFO within a tier, for which `accept` returns true.
    pub fn pop_first_matching<F>(&mut self, mut accept: F) -> Option<Task>
    where
        F: FnMut(&Task) -> bool,
    {
        for tier in Priority::DESCENDING {
            let found = self.buckets[tier.index()]
                .iter()
                .filter_map(|seq| self.slots.get(seq))
                .find(|task| accept(task))
                .map(|task| task.id.clone());

            if let Some(id) = found {
                let task = self.remove(&id)?;
                self.dequeued += 1;
                return Some(task);
            }
        }
        None
    }

    /// Remove a queued task by id.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let (tier, seq) = self.index.remove(id)?;
        let task = self.slots.remove(&seq)?;
        self.live[tier.index()] -= 1;
        self.compact(tier);
        Some(task)
    }

    fn compact(&mut self, tier: Priority) {
        let bucket = &mut self.buckets[tier.index()];
        while let Some(front) = bucket.front() {
            if self.slots.contains_key(front) {
                break;
            }
            bucket.pop_front();
        }

        let live = self.live[tier.index()];
        if bucket.len() > 2 * live + 16 {
            let slots = &self.slots;
            bucket.retain(|seq| slots.contains_key(seq));
        }
    }

    /// Highest-priority queued task, ignoring readiness.
    pub fn peek(&self) -> Option<&Task> {
        Priority::DESCENDING.iter().find_map(|tier| {
            self.buckets[tier.index()]
                .iter()
                .find_map(|seq| self.slots.get(seq))
        })
    }

    /// Queued tasks in dispatch order (tier descending, FIFO within a tier).
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        Priority::DESCENDING.into_iter().flat_map(move |tier| {
            self.buckets[tier.index()]
                .iter()
                .filter_map(move |seq| self.slots.get(seq))
        })
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.len(),
            dequeued: self.dequeued,
            dropped: self.dropped,
            queued_by_tier: self.live,
        }
    }
}
