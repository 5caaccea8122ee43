// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::PlanFile;
use crate::dag::SchedulerStatistics;
use crate::engine::{ExecutorConfig, ParallelExecutionResult, ParallelExecutor, TaskScheduler};
use crate::exec::ProcessRunner;
use crate::types::TaskStatus;

/// High-level entry point used by `main.rs`.
///
/// Loads the plan, submits every task, drains the scheduler with a
/// [`ProcessRunner`] and prints a summary. Ctrl-C cancels the run (in-flight
/// commands finish). Returns whether the run succeeded.
pub async fn run(args: CliArgs) -> Result<bool> {
    let plan_path = args.plan.clone().unwrap_or_else(default_config_path);
    let plan = load_and_validate(&plan_path)
        .with_context(|| format!("loading plan '{}'", plan_path.display()))?;

    let mut exec_config = plan.executor_config();
    if let Some(workers) = args.workers {
        exec_config.workers = usize::from(workers);
    }
    if let Some(strategy) = args.strategy {
        exec_config.strategy = strategy;
    }
    if let Some(max_retries) = args.max_retries {
        exec_config.retry.max_retries = max_retries;
    }

    if args.dry_run {
        print_dry_run(&plan, &exec_config);
        return Ok(true);
    }

    let scheduler = Arc::new(TaskScheduler::new(plan.scheduler_config()));
    for spec in plan.task_specs() {
        let id = spec.id.clone();
        let submission = scheduler
            .submit(spec)
            .with_context(|| format!("submitting task '{id}'"))?;
        debug!(task = %id, tier = %submission.priority, "task submitted");
        if let Some(evicted) = submission.evicted {
            warn!(task = %evicted, "queue full; task dropped");
        }
    }

    let executor = ParallelExecutor::new(
        Arc::clone(&scheduler),
        Arc::new(ProcessRunner::new()),
        exec_config,
    );

    // Ctrl-C -> stop dispatching, let in-flight commands finish.
    {
        let handle = executor.handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            handle.cancel();
        });
    }

    let result = executor.run().await;
    print_summary(&result, &scheduler.statistics());
    info!(success = result.success(), "plan finished");
    Ok(result.success())
}

/// Print tasks in submission order: dependencies first, not grouped by tier.
fn print_dry_run(plan: &PlanFile, exec: &ExecutorConfig) {
    println!("tierdag dry-run");
    println!("  workers = {}", exec.workers);
    println!("  strategy = {:?}", exec.strategy);
    println!("  failure_policy = {:?}", plan.config.failure_policy);
    println!("  max_queue_size = {}", plan.config.max_queue_size);
    println!("  max_retries = {}", exec.retry.max_retries);
    println!();

    println!("tasks in dependency order ({}):", plan.task.len());
    for id in plan.order() {
        let Some(task) = plan.task.get(id) else {
            continue;
        };
        println!("  - {id} [{}]", task.effective_priority());
        println!("      cmd: {}", task.cmd);
        println!("      type: {}", task.effective_type(id));
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        for (key, value) in &task.metadata {
            println!("      {key}: {value}");
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(result: &ParallelExecutionResult, stats: &SchedulerStatistics) {
    println!(
        "{} in {:.2}s: {} completed, {} failed, {} cancelled, {} stalled, {} dropped",
        if result.success() { "succeeded" } else { "failed" },
        result.elapsed.as_secs_f64(),
        result.count(TaskStatus::Completed),
        result.count(TaskStatus::Failed),
        result.count(TaskStatus::Cancelled),
        result.stalled.len(),
        stats.dropped_count,
    );
    for report in result.reports.values() {
        if report.status == TaskStatus::Completed {
            continue;
        }
        match &report.error {
            Some(err) => println!("  {} {}: {}", report.status, report.id, err),
            None => println!("  {} {}", report.status, report.id),
        }
    }
    for id in &result.stalled {
        println!("  stalled {id}");
    }
}
