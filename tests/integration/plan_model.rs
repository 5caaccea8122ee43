// tests/integration/plan_model.rs

use std::path::PathBuf;
use std::time::Duration;

use tierdag::config::{default_config_path, parse_plan};
use tierdag::config::PlanFile;
use tierdag::exec::CMD_KEY;
use tierdag::types::{ExecutionStrategy, FailurePolicy, Priority};
use tierdag_test_utils::builders::{PlanBuilder, TaskConfigBuilder};

#[test]
fn test_full_plan_is_parsed() {
    let raw = parse_plan(
        r#"
[config]
workers = 2
max_queue_size = 50
strategy = "pipeline"
failure_policy = "continue"
rollback_on_failure = true
adaptive_priority = false
dequeue_timeout_ms = 25

[config.retry]
max_retries = 4
initial_backoff_ms = 10
max_backoff_ms = 40

[config.adaptive]
failure_boost = 30

[task.fetch]
cmd = "git fetch"

[task.build]
cmd = "cargo build"
type = "compile"
priority = "critical"
after = ["fetch"]
metadata = { owner = "ci" }

[task.report]
cmd = "echo done"
priority = 72
after = ["build"]
"#,
    )
    .unwrap();
    let plan = PlanFile::try_from(raw).unwrap();

    let exec = plan.executor_config();
    assert_eq!(exec.workers, 2);
    assert_eq!(exec.strategy, ExecutionStrategy::Pipeline);
    assert!(exec.rollback_on_failure);
    assert_eq!(exec.dequeue_timeout, Duration::from_millis(25));
    assert_eq!(exec.retry.max_retries, 4);
    assert_eq!(exec.retry.initial_backoff, Duration::from_millis(10));
    assert_eq!(exec.retry.max_backoff, Duration::from_millis(40));
    assert_eq!(exec.retry.multiplier, 2.0);

    let sched = plan.scheduler_config();
    assert_eq!(sched.max_queue_size, 50);
    assert_eq!(sched.failure_policy, FailurePolicy::Continue);
    assert!(!sched.adaptive_priority);
    assert_eq!(sched.adaptive.failure_boost, 30);
    assert_eq!(sched.adaptive.window, 10);

    assert_eq!(plan.order(), ["fetch", "build", "report"]);
    let specs = plan.task_specs();
    assert_eq!(specs[0].task_type, "fetch");
    assert_eq!(specs[0].priority, Priority::Medium);
    assert_eq!(specs[1].task_type, "compile");
    assert_eq!(specs[1].priority, Priority::Critical);
    assert_eq!(specs[1].metadata.get("owner").map(String::as_str), Some("ci"));
    assert_eq!(specs[1].metadata.get(CMD_KEY).map(String::as_str), Some("cargo build"));
    assert_eq!(specs[2].priority, Priority::High);
    assert_eq!(specs[2].score, Some(72));
    assert_eq!(specs[1].score, None);
    assert!(specs[2].dependencies.contains("build"));
}

#[test]
fn test_builder_plan_orders_dependencies_first() {
    let plan = PlanBuilder::new()
        .workers(3)
        .strategy(ExecutionStrategy::Concurrent)
        .with_task("a", TaskConfigBuilder::new("echo a").after("c").build())
        .with_task("b", TaskConfigBuilder::new("echo b").tier(Priority::Low).build())
        .with_task("c", TaskConfigBuilder::new("echo c").after("b").score(95).build())
        .build();

    assert_eq!(plan.order(), ["b", "c", "a"]);
    assert_eq!(plan.task["c"].effective_priority(), Priority::Critical);
    assert_eq!(plan.executor_config().workers, 3);
    assert_eq!(default_config_path(), PathBuf::from("Tierdag.toml"));
}
