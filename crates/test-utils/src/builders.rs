#![allow(dead_code)]

use std::collections::BTreeMap;

use tierdag::config::{ExecutorSection, PlanFile, PriorityValue, RawPlanFile, TaskConfig};
use tierdag::dag::TaskSpec;
use tierdag::types::{ExecutionStrategy, Priority};

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanBuilder {
    plan: RawPlanFile,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                config: ExecutorSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, id: &str, task: TaskConfig) -> Self {
        self.plan.task.insert(id.to_string(), task);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.plan.config.workers = workers;
        self
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.plan.config.strategy = strategy;
        self
    }

    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.plan.config.max_queue_size = size;
        self
    }

    pub fn build_raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from(self.plan).expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                task_type: None,
                priority: None,
                after: vec![],
                metadata: BTreeMap::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn task_type(mut self, ty: &str) -> Self {
        self.task.task_type = Some(ty.to_string());
        self
    }

    pub fn tier(mut self, tier: Priority) -> Self {
        self.task.priority = Some(PriorityValue::Tier(tier));
        self
    }

    pub fn score(mut self, score: i64) -> Self {
        self.task.priority = Some(PriorityValue::Score(score));
        self
    }

    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.task.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// `TaskSpec` with type `"job"` and the given tier.
pub fn job(id: &str, tier: Priority) -> TaskSpec {
    TaskSpec::new(id, "job").priority(tier)
}

/// `ids[0] <- ids[1] <- ...`: each task depends on the previous one.
pub fn chain(ids: &[&str], tier: Priority) -> Vec<TaskSpec> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let spec = job(id, tier);
            if i == 0 { spec } else { spec.after(ids[i - 1]) }
        })
        .collect()
}
