#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tierdag::dag::SchedulerConfig;
use tierdag::engine::{ExecutorConfig, RetryPolicy, TaskScheduler};
use tierdag::types::{ExecutionStrategy, FailurePolicy};

pub use tierdag_test_utils::builders::{chain, job};
pub use tierdag_test_utils::{init_tracing, with_timeout};

pub fn scheduler() -> Arc<TaskScheduler> {
    Arc::new(TaskScheduler::default())
}

pub fn scheduler_with(max_queue_size: usize, failure_policy: FailurePolicy) -> Arc<TaskScheduler> {
    Arc::new(TaskScheduler::new(SchedulerConfig {
        max_queue_size,
        failure_policy,
        ..SchedulerConfig::default()
    }))
}

/// Executor config with short timeouts and no retries.
pub fn executor_config(workers: usize, strategy: ExecutionStrategy) -> ExecutorConfig {
    ExecutorConfig {
        workers,
        strategy,
        retry: RetryPolicy::none(),
        rollback_on_failure: false,
        dequeue_timeout: Duration::from_millis(100),
        resource_poll_interval: Duration::from_millis(10),
    }
}

pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(5),
        multiplier: 2.0,
        max_backoff: Duration::from_millis(20),
    }
}
