//! Property-based tests for backoff, bounds and outcome classification

use proptest::prelude::*;
use std::time::Duration;
use steadfast::retry::Bounds;
use steadfast::{Attempt, Continuation, Outcome, RetryPolicy};
use tokio::time::Instant;

fn any_continuation() -> impl Strategy<Value = Continuation> {
    prop_oneof![Just(Continuation::Stop), Just(Continuation::Continue)]
}

proptest! {
    #[test]
    fn prop_delay_is_min_of_cap_and_square(
        attempt in 0u32..10_000,
        cap_ms in 0u64..120_000
    ) {
        let cap = Duration::from_millis(cap_ms);
        let policy = RetryPolicy::new().with_max_delay(cap);

        let squared = Duration::from_secs(u64::from(attempt) * u64::from(attempt));
        prop_assert_eq!(policy.delay_for_attempt(attempt), squared.min(cap));
    }

    #[test]
    fn prop_delay_is_monotonic_until_saturated(
        attempt in 0u32..u32::MAX,
        cap_ms in 0u64..120_000
    ) {
        let policy = RetryPolicy::new().with_max_delay(Duration::from_millis(cap_ms));

        let this = policy.delay_for_attempt(attempt);
        let next = policy.delay_for_attempt(attempt + 1);
        prop_assert!(next >= this);
        prop_assert!(next <= policy.max_delay());
    }

    #[test]
    fn prop_delay_never_overflows(attempt in any::<u32>(), unit_ms in 1u64..10_000) {
        let policy = RetryPolicy::new()
            .with_backoff_unit(Duration::from_millis(unit_ms))
            .with_max_delay(Duration::MAX);

        // Saturating arithmetic: no panic, and never below the previous attempt.
        let delay = policy.delay_for_attempt(attempt);
        prop_assert!(delay >= policy.delay_for_attempt(attempt / 2));
    }

    #[test]
    fn prop_attempt_bound_closes_exactly_at_limit(max in 1u32..1_000, attempt in 0u32..2_000) {
        let bounds = Bounds::new(Some(max), None);
        prop_assert_eq!(bounds.attempts_exhausted(attempt), attempt >= max);
    }

    #[test]
    fn prop_missing_error_is_always_success(continuation in any_continuation()) {
        let attempt: Attempt<String> = Attempt::new(continuation, None);
        prop_assert_eq!(attempt.classify(), Outcome::Success);
    }

    #[test]
    fn prop_error_is_never_success(continuation in any_continuation(), error in ".*") {
        let outcome = Attempt::new(continuation, Some(error.clone())).classify();
        prop_assert_eq!(outcome.error(), Some(&error));
        match continuation {
            Continuation::Stop => {
                prop_assert_eq!(outcome, Outcome::Terminal(error));
            }
            Continuation::Continue => {
                prop_assert_eq!(outcome, Outcome::Retryable(error));
            }
        }
    }
}

#[test]
fn test_representative_delays() {
    let cap = Duration::from_secs(30);
    let policy = RetryPolicy::new().with_max_delay(cap);

    let expected = [(0, 0), (1, 1), (2, 4), (5, 25), (100, 30)];
    for (attempt, secs) in expected {
        assert_eq!(policy.delay_for_attempt(attempt), Duration::from_secs(secs));
    }
}

#[test]
fn test_deadline_remaining_saturates() {
    let now = Instant::now();
    let bounds = Bounds::new(None, Some(now));

    assert_eq!(
        bounds.remaining(now + Duration::from_secs(5)),
        Some(Duration::ZERO)
    );
}
