use std::collections::HashSet;

use proptest::prelude::*;
use tierdag::dag::{CoreScheduler, DequeueFilter, SchedulerConfig, TaskSpec};
use tierdag::types::{FailurePolicy, Priority};

fn tier_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

// Acyclic by construction: task i may only depend on tasks 0..i.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<TaskSpec>> {
    (1..=max_tasks).prop_flat_map(|n| {
        proptest::collection::vec(
            (tier_strategy(), proptest::collection::vec(any::<usize>(), 0..4)),
            n,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (tier, deps))| {
                    let spec = TaskSpec::new(format!("t{i}"), "prop").priority(tier);
                    if i == 0 {
                        spec
                    } else {
                        spec.after_all(deps.into_iter().map(|d| format!("t{}", d % i)))
                    }
                })
                .collect()
        })
    })
}

fn core(max_queue_size: usize, failure_policy: FailurePolicy) -> CoreScheduler {
    CoreScheduler::new(SchedulerConfig {
        max_queue_size,
        failure_policy,
        adaptive_priority: false,
        ..SchedulerConfig::default()
    })
}

proptest! {
    #[test]
    fn queue_never_exceeds_capacity(
        tiers in proptest::collection::vec(tier_strategy(), 0..60),
        capacity in 1usize..20,
    ) {
        let mut s = core(capacity, FailurePolicy::Cascade);
        for (i, tier) in tiers.iter().enumerate() {
            s.submit(TaskSpec::new(format!("t{i}"), "prop").priority(*tier)).unwrap();
            prop_assert!(s.queued_len() <= capacity);
        }

        let n = tiers.len();
        let stats = s.statistics();
        prop_assert_eq!(stats.queued, n.min(capacity));
        prop_assert_eq!(stats.dropped_count as usize, n.saturating_sub(capacity));
        prop_assert_eq!(stats.cancelled_count, n.saturating_sub(capacity));
    }

    #[test]
    fn dequeue_only_returns_ready_tasks_in_tier_order(
        specs in dag_strategy(12),
        failing in proptest::collection::hash_set(0usize..12, 0..4),
    ) {
        let n = specs.len();
        let mut s = core(1000, FailurePolicy::Cascade);
        for spec in specs {
            s.submit(spec).unwrap();
        }

        let mut completed: HashSet<String> = HashSet::new();
        let mut dispatched = 0usize;
        loop {
            let ready_tiers: Vec<Priority> = s
                .queued_ids()
                .iter()
                .filter_map(|id| {
                    let entry = s.task_entry(id)?;
                    let ready = s.graph().dependencies_of(id).iter().all(|d| completed.contains(d));
                    ready.then_some(entry.priority)
                })
                .collect();

            let Some(task) = s.try_dequeue(DequeueFilter::Any) else {
                prop_assert!(ready_tiers.is_empty());
                break;
            };
            dispatched += 1;

            for dep in &task.dependencies {
                prop_assert!(completed.contains(dep), "{} dispatched before {}", task.id, dep);
            }
            prop_assert!(ready_tiers.iter().all(|t| *t <= task.priority));

            let index: usize = task.id[1..].parse().unwrap();
            if failing.contains(&index) {
                s.mark_failed(&task.id).unwrap();
            } else {
                s.mark_completed(&task.id).unwrap();
                completed.insert(task.id.clone());
            }
        }

        // Everything was dispatched or cancelled by a failure cascade.
        let stats = s.statistics();
        prop_assert_eq!(stats.queued, 0);
        prop_assert_eq!(dispatched + stats.cancelled_count, n);
        prop_assert!(s.is_drained());
    }
}
