// tests/retry_policy.rs

use std::time::Duration;

use tierdag::engine::{AttemptDecision, RetryPolicy, TaskOutcome, decide_after_attempt};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn default_backoff_doubles_until_capped() {
    let policy = RetryPolicy::default();
    let waits: Vec<Duration> = (1..=7).map(|n| policy.backoff_for(n)).collect();
    assert_eq!(
        waits,
        vec![ms(100), ms(200), ms(400), ms(800), ms(1600), ms(3200), ms(5000)]
    );
    assert_eq!(policy.backoff_for(40), ms(5000));
}

#[test]
fn backoff_overflow_falls_back_to_the_cap() {
    let huge = RetryPolicy {
        multiplier: f64::INFINITY,
        ..RetryPolicy::default()
    };
    assert_eq!(huge.backoff_for(1), ms(100));
    assert_eq!(huge.backoff_for(2), ms(5000));
    assert_eq!(RetryPolicy::default().backoff_for(u32::MAX), ms(5000));

    // Shrinking multipliers are treated as constant backoff.
    let flat = RetryPolicy {
        multiplier: 0.5,
        ..RetryPolicy::default()
    };
    assert_eq!(flat.backoff_for(3), ms(100));
}

#[test]
fn failures_retry_until_the_budget_is_spent() {
    let policy = RetryPolicy::default();
    let failed = TaskOutcome::Failed("exit code 1".to_string());

    assert_eq!(
        decide_after_attempt(&policy, 1, &failed),
        AttemptDecision::Retry { backoff: ms(100) }
    );
    assert_eq!(
        decide_after_attempt(&policy, 2, &failed),
        AttemptDecision::Retry { backoff: ms(200) }
    );
    assert_eq!(decide_after_attempt(&policy, 3, &failed), AttemptDecision::Finish);
    assert_eq!(
        decide_after_attempt(&policy, 1, &TaskOutcome::Success),
        AttemptDecision::Finish
    );
    assert_eq!(
        decide_after_attempt(&RetryPolicy::none(), 1, &failed),
        AttemptDecision::Finish
    );
}
