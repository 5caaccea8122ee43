use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tierdag::dag::Task;
use tierdag::engine::TaskOutcome;
use tierdag::exec::TaskRunner;
use tierdag::types::TaskId;

/// Something a runner observed, in global order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Started(TaskId),
    Finished(TaskId),
}

/// Tracks how many attempts are in flight at once.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    inner: Mutex<ProbeState>,
}

#[derive(Debug, Default)]
struct ProbeState {
    in_flight: usize,
    max_in_flight: usize,
    events: Vec<RunEvent>,
}

impl ConcurrencyProbe {
    pub fn enter(&self, id: &str) {
        let mut s = self.inner.lock().unwrap();
        s.in_flight += 1;
        s.max_in_flight = s.max_in_flight.max(s.in_flight);
        s.events.push(RunEvent::Started(id.to_string()));
    }

    pub fn exit(&self, id: &str) {
        let mut s = self.inner.lock().unwrap();
        s.in_flight -= 1;
        s.events.push(RunEvent::Finished(id.to_string()));
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.lock().unwrap().max_in_flight
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Ids in the order their attempts started.
    pub fn start_order(&self) -> Vec<TaskId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::Started(id) => Some(id),
                RunEvent::Finished(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Script {
    /// Attempts that fail before the task starts succeeding.
    failures: u32,
    delay: Option<Duration>,
    panics: bool,
}

/// A runner with per-task scripted outcomes that never touches the OS.
///
/// Tasks succeed after `default_delay` unless scripted otherwise.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    scripts: HashMap<TaskId, Script>,
    default_delay: Duration,
    attempts: Mutex<HashMap<TaskId, u32>>,
    probe: Arc<ConcurrencyProbe>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Every attempt of `id` fails.
    pub fn fail(self, id: &str) -> Self {
        self.fail_times(id, u32::MAX)
    }

    /// The first `n` attempts of `id` fail, later ones succeed.
    pub fn fail_times(mut self, id: &str, n: u32) -> Self {
        self.scripts.entry(id.to_string()).or_default().failures = n;
        self
    }

    pub fn delay_for(mut self, id: &str, delay: Duration) -> Self {
        self.scripts.entry(id.to_string()).or_default().delay = Some(delay);
        self
    }

    pub fn panic_on(mut self, id: &str) -> Self {
        self.scripts.entry(id.to_string()).or_default().panics = true;
        self
    }

    pub fn probe(&self) -> Arc<ConcurrencyProbe> {
        Arc::clone(&self.probe)
    }

    pub fn attempts(&self, id: &str) -> u32 {
        self.attempts.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    /// Ids that ran at least once, in start order, without repeats.
    pub fn executed(&self) -> Vec<TaskId> {
        let mut seen = Vec::new();
        for id in self.probe.start_order() {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }
}

impl TaskRunner for ScriptedRunner {
    fn run_task(&self, task: Task, attempt: u32) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        Box::pin(async move {
            let script = self.scripts.get(&task.id).copied().unwrap_or_default();
            *self.attempts.lock().unwrap().entry(task.id.clone()).or_insert(0) += 1;

            self.probe.enter(&task.id);
            tokio::time::sleep(script.delay.unwrap_or(self.default_delay)).await;
            self.probe.exit(&task.id);

            if script.panics {
                panic!("scripted panic in task {}", task.id);
            }
            if attempt <= script.failures {
                TaskOutcome::Failed(format!("scripted failure {attempt}"))
            } else {
                TaskOutcome::Success
            }
        })
    }
}
