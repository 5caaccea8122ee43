// tests/integration/plan_run.rs

#![cfg(unix)]

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tierdag::cli::CliArgs;
use tierdag::dag::TaskSpec;
use tierdag::engine::{ExecutorConfig, ParallelExecutor, RetryPolicy, TaskScheduler};
use tierdag::exec::{CMD_KEY, ProcessRunner};
use tierdag::types::TaskStatus;
use tierdag_test_utils::init_tracing;

fn args(path: &std::path::Path) -> CliArgs {
    CliArgs {
        plan: Some(path.to_path_buf()),
        workers: Some(2),
        strategy: None,
        max_retries: Some(0),
        log_level: None,
        dry_run: false,
    }
}

fn plan_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[tokio::test]
async fn test_process_runner_reports_exit_status() {
    init_tracing();
    let scheduler = Arc::new(TaskScheduler::default());
    scheduler
        .submit(TaskSpec::new("ok", "sh").meta(CMD_KEY, "test \"$TIERDAG_TASK_ID\" = ok"))
        .unwrap();
    scheduler
        .submit(TaskSpec::new("bad", "sh").meta(CMD_KEY, "echo oops >&2; exit 3"))
        .unwrap();
    scheduler.submit(TaskSpec::new("nocmd", "sh")).unwrap();

    let config = ExecutorConfig {
        retry: RetryPolicy::none(),
        ..ExecutorConfig::default()
    };
    let result = ParallelExecutor::new(scheduler, Arc::new(ProcessRunner::new()), config)
        .run()
        .await;

    assert_eq!(result.status_of("ok"), Some(TaskStatus::Completed));
    assert_eq!(result.status_of("bad"), Some(TaskStatus::Failed));
    assert_eq!(result.reports["bad"].error.as_deref(), Some("exit code 3"));
    assert_eq!(result.status_of("nocmd"), Some(TaskStatus::Failed));
    assert!(result.reports["nocmd"].error.as_deref().unwrap().contains("no 'cmd'"));
}

#[tokio::test]
async fn test_run_plan_end_to_end() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("order.txt");
    let file = plan_file(&format!(
        r#"
[task.first]
cmd = "echo first >> {m}"

[task.second]
cmd = "echo second >> {m}"
after = ["first"]
priority = "critical"
"#,
        m = marker.display()
    ));

    assert!(tierdag::run(args(file.path())).await.unwrap());
    let written = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(written.lines().collect::<Vec<_>>(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_failing_plan_reports_failure() {
    init_tracing();
    let file = plan_file(
        r#"
[task.broken]
cmd = "exit 1"

[task.downstream]
cmd = "echo never"
after = ["broken"]
"#,
    );
    assert!(!tierdag::run(args(file.path())).await.unwrap());
}

#[tokio::test]
async fn test_dry_run_executes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("touched");
    let file = plan_file(&format!(
        "[task.touch]\ncmd = \"touch {}\"\n",
        marker.display()
    ));

    let mut dry = args(file.path());
    dry.dry_run = true;
    assert!(tierdag::run(dry).await.unwrap());
    assert!(!marker.exists());
}
