#![cfg(feature = "property-test")]
// Property checks for the data-model invariants that don't need a store or queue wired up
// (retry-count monotonicity and the success/total counter relationship; the
// queue-presence invariants are exercised against the real RocksDB-backed
// queue in scheduler-queue's own test suite).

use proptest::prelude::*;
use scheduler_core::task::{Priority, Task, TaskStatus};

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

proptest! {
    #[test]
    fn retry_count_never_exceeds_max_retries(
        priority in arb_priority(),
        max_retries in 0i32..10,
        attempts in 0u32..20,
    ) {
        let mut task = Task::new(1, "text-generation".into(), "x".into(), priority);
        task.max_retries = max_retries;

        for _ in 0..attempts {
            task.status = TaskStatus::Failed;
            if task.can_retry() {
                task.retry_count += 1;
                task.status = TaskStatus::Pending;
            } else {
                break;
            }
        }

        prop_assert!(task.retry_count <= task.max_retries);
    }

    #[test]
    fn retry_count_is_monotonic_non_decreasing(
        priority in arb_priority(),
        increments in prop::collection::vec(0u32..5, 0..20),
    ) {
        let mut task = Task::new(1, "text-generation".into(), "x".into(), priority);
        task.max_retries = 1000;
        let mut previous = task.retry_count;

        for inc in increments {
            task.retry_count += inc as i32;
            prop_assert!(task.retry_count >= previous);
            previous = task.retry_count;
        }
    }
}

#[derive(Clone, Debug)]
struct ModelCounters {
    total_requests: i64,
    success_requests: i64,
}

impl quickcheck::Arbitrary for ModelCounters {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let successes = u16::arbitrary(g) as i64;
        let extra_failures = u16::arbitrary(g) as i64;
        ModelCounters {
            total_requests: successes + extra_failures,
            success_requests: successes,
        }
    }
}

#[quickcheck_macros::quickcheck]
fn success_requests_never_exceeds_total(counters: ModelCounters) -> bool {
    counters.success_requests <= counters.total_requests
}
