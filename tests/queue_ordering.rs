// tests/queue_ordering.rs

mod common;
use crate::common::{chain, job, scheduler, scheduler_with};

use std::time::Duration;

use tierdag::errors::TierdagError;
use tierdag::types::{FailurePolicy, Priority, TaskStatus};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn readiness_beats_tier() -> TestResult {
    let s = scheduler();
    s.submit(job("A", Priority::High))?;
    s.submit(job("B", Priority::Critical).after("A"))?;

    assert_eq!(s.try_dequeue().map(|t| t.id), Some("A".to_string()));
    assert!(s.try_dequeue().is_none(), "B must wait for A");

    s.mark_completed("A")?;
    assert_eq!(s.try_dequeue().map(|t| t.id), Some("B".to_string()));
    Ok(())
}

#[test]
fn higher_tier_first_then_fifo_within_tier() -> TestResult {
    let s = scheduler();
    s.submit(job("m1", Priority::Medium))?;
    s.submit(job("low", Priority::Low))?;
    s.submit(job("m2", Priority::Medium))?;
    s.submit(job("crit", Priority::Critical))?;
    s.submit(job("m3", Priority::Medium))?;

    assert_eq!(s.peek().map(|t| t.id), Some("crit".to_string()));

    let order: Vec<String> = std::iter::from_fn(|| s.try_dequeue()).map(|t| t.id).collect();
    assert_eq!(order, vec!["crit", "m1", "m2", "m3", "low"]);
    Ok(())
}

#[test]
fn full_queue_evicts_earliest_lowest_tier_task() -> TestResult {
    let s = scheduler_with(2, FailurePolicy::Cascade);
    s.submit(job("X", Priority::Low))?;
    s.submit(job("Y", Priority::Medium))?;
    let z = s.submit(job("Z", Priority::High))?;

    assert_eq!(z.evicted.as_deref(), Some("X"));
    assert_eq!(s.queued_ids(), vec!["Z", "Y"]);
    assert_eq!(s.task_status("X"), Some(TaskStatus::Cancelled));

    let stats = s.statistics();
    assert_eq!(stats.dropped_count, 1);
    assert_eq!(stats.queued, 2);
    assert_eq!(stats.queued_in(Priority::High), 1);
    assert_eq!(stats.queued_in(Priority::Medium), 1);
    assert_eq!(stats.queued_in(Priority::Low), 0);
    Ok(())
}

#[test]
fn mark_completed_is_idempotent() -> TestResult {
    let s = scheduler();
    s.submit(job("A", Priority::Medium))?;
    s.try_dequeue();

    let first = s.mark_completed("A")?;
    assert!(first.changed);
    let after_first = s.statistics();

    let second = s.mark_completed("A")?;
    assert!(!second.changed);
    let after_second = s.statistics();

    assert_eq!(after_first.completed_count, 1);
    assert_eq!(after_second.completed_count, 1);
    assert_eq!(after_first.wakeups, after_second.wakeups);
    Ok(())
}

#[test]
fn invalid_submissions_are_rejected_synchronously() -> TestResult {
    let s = scheduler();
    s.submit(job("A", Priority::Medium))?;

    assert!(matches!(
        s.submit(job("A", Priority::High)),
        Err(TierdagError::DuplicateTask(id)) if id == "A"
    ));
    assert!(matches!(
        s.submit(job("B", Priority::High).after("B")),
        Err(TierdagError::SelfDependency(id)) if id == "B"
    ));
    assert!(!s.try_submit(job("A", Priority::Low)));

    assert_eq!(s.size(), 1);
    assert_eq!(s.task_status("B"), None);
    Ok(())
}

#[test]
fn dependency_cycle_is_rejected_at_submission() -> TestResult {
    let s = scheduler();
    s.submit(job("A", Priority::Medium).after("B"))?;

    match s.submit(job("B", Priority::Medium).after("A")) {
        Err(TierdagError::CycleDetected(path)) => {
            assert_eq!(path.first().map(String::as_str), Some("B"));
            assert_eq!(path.last().map(String::as_str), Some("B"));
            assert!(path.contains(&"A".to_string()));
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
    assert_eq!(s.queued_ids(), vec!["A"]);
    Ok(())
}

#[test]
fn failure_cascades_to_queued_dependents() -> TestResult {
    let s = scheduler();
    for spec in chain(&["A", "B", "C"], Priority::High) {
        s.submit(spec)?;
    }
    s.submit(job("other", Priority::Low))?;

    assert_eq!(s.try_dequeue().map(|t| t.id), Some("A".to_string()));
    let step = s.mark_failed("A")?;

    assert!(step.changed);
    assert_eq!(step.newly_cancelled, vec!["B", "C"]);
    assert_eq!(s.task_status("A"), Some(TaskStatus::Failed));
    assert_eq!(s.task_status("B"), Some(TaskStatus::Cancelled));
    assert_eq!(s.task_status("C"), Some(TaskStatus::Cancelled));
    assert_eq!(s.queued_ids(), vec!["other"]);

    let late = s.submit(job("D", Priority::Medium).after("A"))?;
    assert!(late.cancelled_on_arrival);
    assert_eq!(s.task_status("D"), Some(TaskStatus::Cancelled));
    Ok(())
}

#[test]
fn continue_policy_treats_failed_dependency_as_resolved() -> TestResult {
    let s = scheduler_with(100, FailurePolicy::Continue);
    s.submit(job("A", Priority::Medium))?;
    s.submit(job("B", Priority::Medium).after("A"))?;

    s.try_dequeue();
    let step = s.mark_failed("A")?;
    assert_eq!(step.newly_ready, vec!["B"]);
    assert_eq!(s.try_dequeue().map(|t| t.id), Some("B".to_string()));
    Ok(())
}

#[test]
fn completing_an_unknown_id_satisfies_external_prerequisite() -> TestResult {
    let s = scheduler();
    s.submit(job("B", Priority::Medium).after("ext"))?;
    assert!(s.try_dequeue().is_none());
    assert!(s.is_stalled());

    let step = s.mark_completed("ext")?;
    assert!(step.changed);
    assert_eq!(step.newly_ready, vec!["B"]);
    assert!(s.is_completed("ext"));
    assert_eq!(s.try_dequeue().map(|t| t.id), Some("B".to_string()));
    Ok(())
}

#[test]
fn resolved_external_prerequisite_cannot_be_submitted() -> TestResult {
    let s = scheduler();
    s.submit(job("B", Priority::Medium).after("ext"))?;
    s.mark_completed("ext")?;
    s.mark_failed("gone")?;

    assert!(matches!(
        s.submit(job("ext", Priority::High)),
        Err(TierdagError::DuplicateTask(id)) if id == "ext"
    ));
    assert!(matches!(
        s.submit(job("gone", Priority::High)),
        Err(TierdagError::DuplicateTask(id)) if id == "gone"
    ));
    assert_eq!(s.queued_ids(), vec!["B"]);
    assert_eq!(s.try_dequeue().map(|t| t.id), Some("B".to_string()));
    assert!(s.try_dequeue().is_none());
    Ok(())
}

#[test]
fn late_dependent_of_cancelled_task_is_cancelled_on_arrival() -> TestResult {
    let s = scheduler();
    s.submit(job("A", Priority::High))?;
    s.submit(job("B", Priority::High).after("A"))?;
    s.submit(job("solo", Priority::Low))?;
    s.try_dequeue();
    s.mark_failed("A")?;
    assert_eq!(s.task_status("B"), Some(TaskStatus::Cancelled));

    let late = s.submit(job("D", Priority::Medium).after("B"))?;
    assert!(late.cancelled_on_arrival);
    assert_eq!(s.task_status("D"), Some(TaskStatus::Cancelled));

    s.remove("solo");
    let after_removed = s.submit(job("E", Priority::Medium).after("solo"))?;
    assert!(after_removed.cancelled_on_arrival);
    assert_eq!(s.size(), 0);
    assert!(!s.is_stalled());
    Ok(())
}

#[test]
fn remove_only_affects_queued_tasks() -> TestResult {
    let s = scheduler();
    s.submit(job("run", Priority::High))?;
    s.submit(job("wait", Priority::Low))?;
    s.submit(job("child", Priority::Low).after("wait"))?;
    s.try_dequeue();

    assert!(!s.remove("run"), "running task cannot be removed");
    assert!(!s.remove("nope"));
    assert!(s.remove("wait"));
    assert!(!s.remove("wait"));
    assert_eq!(s.task_status("wait"), Some(TaskStatus::Cancelled));

    // Dependents of a removed task stay blocked.
    assert_eq!(s.task_status("child"), Some(TaskStatus::Queued));
    assert_eq!(s.stale_tasks(Duration::ZERO).len(), 1);
    Ok(())
}

#[test]
fn remove_cascade_cancels_queued_dependents() -> TestResult {
    let s = scheduler();
    for spec in chain(&["A", "B", "C"], Priority::Medium) {
        s.submit(spec)?;
    }
    assert_eq!(s.remove_cascade("A"), vec!["A", "B", "C"]);
    assert_eq!(s.size(), 0);
    assert_eq!(s.statistics().cancelled_count, 3);
    assert!(s.remove_cascade("A").is_empty());
    Ok(())
}

#[test]
fn stale_tasks_report_unmet_and_never_submitted_dependencies() -> TestResult {
    let s = scheduler();
    s.submit(job("A", Priority::Medium))?;
    s.submit(job("B", Priority::Medium).after("A").after("ghost"))?;
    s.submit(job("free", Priority::Medium))?;

    let stale = s.stale_tasks(Duration::ZERO);
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, "B");
    assert_eq!(stale[0].unmet, vec!["A", "ghost"]);
    assert_eq!(stale[0].never_submitted, vec!["ghost"]);

    assert!(s.stale_tasks(Duration::from_secs(3600)).is_empty());
    Ok(())
}

#[test]
fn report_result_requires_a_running_task() -> TestResult {
    let s = scheduler();
    s.submit(job("A", Priority::Medium))?;

    assert!(matches!(
        s.report_result("missing", true, 1.0, None),
        Err(TierdagError::TaskNotFound(_))
    ));
    assert!(matches!(
        s.report_result("A", true, 1.0, None),
        Err(TierdagError::InvalidTransition { .. })
    ));

    s.try_dequeue();
    assert_eq!(s.statistics().running_count, 1);
    s.report_result("A", false, 0.25, Some("boom".to_string()))?;
    assert_eq!(s.task_status("A"), Some(TaskStatus::Failed));

    let stats = s.statistics();
    assert_eq!(stats.running_count, 0);
    assert_eq!(stats.failed_count, 1);
    assert_eq!(stats.dequeued_count, 1);
    Ok(())
}
