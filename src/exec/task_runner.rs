// src/exec/task_runner.rs

//! Shell command runner for plan files.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::Task;
use crate::engine::TaskOutcome;

use super::backend::TaskRunner;

/// Metadata key holding the shell command of a task.
pub const CMD_KEY: &str = "cmd";

/// Runs `metadata["cmd"]` through the platform shell.
///
/// Exit status 0 is success; anything else (including a missing command or a
/// spawn error) is a failure. Stdout and stderr are drained and logged at
/// debug level so pipes never fill.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl TaskRunner for ProcessRunner {
    fn run_task(&self, task: Task, attempt: u32) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        Box::pin(async move {
            match run_command(&task, attempt).await {
                Ok(outcome) => outcome,
                Err(err) => TaskOutcome::Failed(format!("{err:#}")),
            }
        })
    }
}

async fn run_command(task: &Task, attempt: u32) -> Result<TaskOutcome> {
    let script = task
        .metadata
        .get(CMD_KEY)
        .ok_or_else(|| anyhow!("task '{}' has no '{CMD_KEY}' to run", task.id))?;

    info!(task = %task.id, attempt, cmd = %script, "starting task process");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("TIERDAG_TASK_ID", &task.id)
        .env("TIERDAG_TASK_TYPE", &task.task_type)
        .env("TIERDAG_ATTEMPT", attempt.to_string())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.id))?;

    if let Some(stdout) = child.stdout.take() {
        let id = task.id.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %id, "stdout: {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let id = task.id.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %id, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", task.id))?;

    let code = status.code().unwrap_or(-1);
    info!(task = %task.id, attempt, exit_code = code, success = status.success(), "task process exited");

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(format!("exit code {code}"))
    })
}
