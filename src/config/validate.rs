// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::{Result, TierdagError};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = TierdagError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        let order = validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.task, order))
    }
}

/// Validate a raw plan and return its task ids in dependency order.
fn validate_raw_plan(plan: &RawPlanFile) -> Result<Vec<String>> {
    ensure_has_tasks(plan)?;
    validate_global_config(plan)?;
    validate_task_dependencies(plan)?;
    dependency_order(plan)
}

fn ensure_has_tasks(plan: &RawPlanFile) -> Result<()> {
    if plan.task.is_empty() {
        return Err(TierdagError::ConfigError(
            "plan must contain at least one [task.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    let cfg = &plan.config;
    if cfg.workers == 0 {
        return Err(TierdagError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.max_queue_size == 0 {
        return Err(TierdagError::ConfigError(
            "[config].max_queue_size must be >= 1 (got 0)".to_string(),
        ));
    }
    if !(cfg.retry.multiplier.is_finite() && cfg.retry.multiplier >= 1.0) {
        return Err(TierdagError::ConfigError(format!(
            "[config.retry].multiplier must be >= 1.0 (got {})",
            cfg.retry.multiplier
        )));
    }
    if cfg.adaptive.window == 0 || cfg.adaptive.history_capacity < cfg.adaptive.window {
        return Err(TierdagError::ConfigError(
            "[config.adaptive] needs 1 <= window <= history_capacity".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (id, task) in plan.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(TierdagError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                id
            )));
        }
        for dep in task.after.iter() {
            if dep == id {
                return Err(TierdagError::SelfDependency(id.clone()));
            }
            if !plan.task.contains_key(dep) {
                return Err(TierdagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    id, dep
                )));
            }
        }
    }
    Ok(())
}

fn dependency_order(plan: &RawPlanFile) -> Result<Vec<String>> {
    // Edge direction: dep -> task, so `after = ["A"]` on B adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in plan.task.keys() {
        graph.add_node(id.as_str());
    }
    for (id, task) in plan.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id().to_string();
            Err(TierdagError::CycleDetected(cycle_path(plan, &node)))
        }
    }
}

/// Walk `after` edges from `start` until it is reached again.
fn cycle_path(plan: &RawPlanFile, start: &str) -> Vec<String> {
    fn walk<'a>(
        plan: &'a RawPlanFile,
        current: &'a str,
        start: &str,
        path: &mut Vec<&'a str>,
    ) -> bool {
        let Some(task) = plan.task.get(current) else {
            return false;
        };
        for dep in &task.after {
            if dep == start {
                return true;
            }
            if path.contains(&dep.as_str()) {
                continue;
            }
            path.push(dep);
            if walk(plan, dep, start, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    let mut path = vec![start];
    if walk(plan, start, start, &mut path) {
        path.push(start);
    }
    path.into_iter().map(str::to_string).collect()
}
