// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::dag::task_info::Task;
use crate::types::{FailurePolicy, TaskId};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<TaskId>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskId>,
    /// Whether this id was actually submitted (vs. only named as a dependency).
    submitted: bool,
}

/// In-memory dependency graph keyed by task id.
///
/// Edges are registered as tasks are submitted. A dependency on an id that
/// was never submitted creates a placeholder node, which is how stalled
/// tasks are told apart from merely waiting ones.
///
/// The completed-set only grows.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<TaskId, DagNode>,
    completed: HashSet<TaskId>,
    failed: HashSet<TaskId>,
    /// Union-find parents; roots identify dependency chains.
    chain_parent: HashMap<TaskId, TaskId>,
    policy: FailurePolicy,
}

impl DependencyGraph {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Register a submitted task and its edges.
    pub fn register(&mut self, id: &str, deps: impl IntoIterator<Item = TaskId>) {
        let deps: Vec<TaskId> = deps.into_iter().collect();

        for dep in &deps {
            self.nodes
                .entry(dep.clone())
                .or_default()
                .dependents
                .push(id.to_string());
        }

        let node = self.nodes.entry(id.to_string()).or_default();
        node.submitted = true;
        node.deps = deps.clone();

        for dep in &deps {
            self.union_chains(id, dep);
        }
        self.find_chain(id);
    }

    pub fn is_submitted(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|n| n.submitted)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one as a dependency).
    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// All transitive dependents of `id`, in breadth-first order.
    pub fn transitive_dependents(&self, id: &str) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut frontier: Vec<&str> = vec![id];

        while let Some(current) = frontier.pop() {
            for dependent in self.dependents_of(current) {
                if visited.insert(dependent.as_str()) {
                    out.push(dependent.clone());
                    frontier.push(dependent.as_str());
                }
            }
        }

        out
    }

    /// Whether every dependency of `task` is resolved.
    ///
    /// Under `FailurePolicy::Continue` a failed dependency also counts.
    pub fn is_ready(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|dep| self.is_resolved(dep))
    }

    fn is_resolved(&self, dep: &str) -> bool {
        self.completed.contains(dep)
            || (self.policy == FailurePolicy::Continue && self.failed.contains(dep))
    }

    /// Dependencies of `task` that are not yet resolved.
    pub fn unmet_dependencies(&self, task: &Task) -> Vec<TaskId> {
        task.dependencies
            .iter()
            .filter(|dep| !self.is_resolved(dep))
            .cloned()
            .collect()
    }

    /// Add `id` to the completed-set.
    ///
    /// Returns `false` when the id was already completed (or failed): the
    /// call is then a no-op and callers must not wake waiters again.
    pub fn mark_completed(&mut self, id: &str) -> bool {
        if self.completed.contains(id) || self.failed.contains(id) {
            debug!(task = %id, "mark_completed on terminal task; ignoring");
            return false;
        }
        self.completed.insert(id.to_string());
        true
    }

    /// Record a terminal failure. Returns `false` if `id` was already terminal.
    pub fn mark_failed(&mut self, id: &str) -> bool {
        if self.completed.contains(id) || self.failed.contains(id) {
            debug!(task = %id, "mark_failed on terminal task; ignoring");
            return false;
        }
        self.failed.insert(id.to_string());
        true
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    pub fn is_failed(&self, id: &str) -> bool {
        self.failed.contains(id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Would registering `id` with `deps` close a cycle?
    ///
    /// Walks dependency edges from each new dependency; reaching `id` means
    /// `id` is already (transitively) a prerequisite of one of its own
    /// dependencies. Returns the offending path, starting and ending at `id`.
    pub fn would_close_cycle(&self, id: &str, deps: &[TaskId]) -> Option<Vec<TaskId>> {
        for dep in deps {
            let mut path = vec![id.to_string()];
            let mut visited = HashSet::new();
            if self.path_to(dep, id, &mut visited, &mut path) {
                return Some(path);
            }
        }
        None
    }

    fn path_to(
        &self,
        from: &str,
        target: &str,
        visited: &mut HashSet<TaskId>,
        path: &mut Vec<TaskId>,
    ) -> bool {
        path.push(from.to_string());
        if from == target {
            return true;
        }
        if visited.insert(from.to_string()) {
            for next in self.dependencies_of(from) {
                if self.path_to(next, target, visited, path) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    /// Chain identifier: the union-find root of `id`'s weakly connected
    /// component.
    pub fn chain_of(&self, id: &str) -> TaskId {
        let mut current = id;
        while let Some(parent) = self.chain_parent.get(current) {
            if parent == current {
                break;
            }
            current = parent;
        }
        current.to_string()
    }

    fn find_chain(&mut self, id: &str) -> TaskId {
        let root = self.chain_of(id);
        // Path compression.
        let mut current = id.to_string();
        while current != root {
            let next = self
                .chain_parent
                .insert(current.clone(), root.clone())
                .unwrap_or_else(|| root.clone());
            current = next;
        }
        self.chain_parent.entry(root.clone()).or_insert(root.clone());
        root
    }

    fn union_chains(&mut self, a: &str, b: &str) {
        let ra = self.find_chain(a);
        let rb = self.find_chain(b);
        if ra != rb {
            // Deterministic: the lexicographically smaller root wins.
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.chain_parent.insert(merge, keep);
        }
    }
}
