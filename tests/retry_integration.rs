//! Retry scheduler lifecycle against the public API.

use std::collections::HashMap;

use rotor::config::RetryConfig;
use rotor::retry::{
    classify, ErrorType, GiveUpReason, MessageState, RetryDecision, RetryScheduler,
};

fn config() -> RetryConfig {
    RetryConfig {
        jitter: false,
        ..Default::default()
    }
}

#[test]
fn temporary_failure_runs_the_full_budget() {
    let scheduler = RetryScheduler::new(config());

    let mut delays = Vec::new();
    for attempt in 1..=5u32 {
        match scheduler.record_failure("m1", "c1", "connection reset by network", None) {
            RetryDecision::Retry {
                attempt: a,
                delay_seconds,
            } => {
                assert_eq!(a.attempt_number, attempt);
                assert_eq!(a.error_type, ErrorType::Temporary);
                delays.push(delay_seconds);
            }
            other => panic!("expected Retry, got {:?}", other),
        }
    }
    // Doubling from the 2s base: 2, 4, 8, 16, 32.
    assert_eq!(delays, vec![2.0, 4.0, 8.0, 16.0, 32.0]);

    match scheduler.record_failure("m1", "c1", "connection reset by network", None) {
        RetryDecision::GiveUp {
            reason,
            attempts_made,
            error_type,
        } => {
            assert_eq!(reason, GiveUpReason::RetriesExhausted);
            assert_eq!(attempts_made, 5);
            assert_eq!(error_type, ErrorType::Temporary);
        }
        other => panic!("expected GiveUp, got {:?}", other),
    }
}

#[test]
fn success_midway_clears_the_retry_state() {
    let scheduler = RetryScheduler::new(config());

    scheduler.record_failure("m1", "c1", "timeout", None);
    scheduler.record_failure("m1", "c1", "timeout", None);
    assert_eq!(scheduler.message_state("m1"), Some(MessageState::Retrying));

    scheduler.record_success("m1");
    assert!(scheduler.message_state("m1").is_none());

    // A later failure starts a fresh attempt sequence.
    match scheduler.record_failure("m1", "c1", "timeout", None) {
        RetryDecision::Retry { attempt, .. } => assert_eq!(attempt.attempt_number, 1),
        other => panic!("expected Retry, got {:?}", other),
    }
}

#[test]
fn error_classes_keep_independent_budgets() {
    let scheduler = RetryScheduler::new(config());

    // Server errors get three attempts.
    for _ in 0..3 {
        assert!(matches!(
            scheduler.record_failure("srv", "c1", "internal failure", None),
            RetryDecision::Retry { .. }
        ));
    }
    assert!(matches!(
        scheduler.record_failure("srv", "c1", "internal failure", None),
        RetryDecision::GiveUp { .. }
    ));

    // Rate-limit errors on another message still have five.
    for _ in 0..5 {
        assert!(matches!(
            scheduler.record_failure("rl", "c1", "429 too many requests", None),
            RetryDecision::Retry { .. }
        ));
    }
}

#[test]
fn carrier_multiplier_shapes_the_whole_sequence() {
    let scheduler = RetryScheduler::new(RetryConfig {
        jitter: false,
        carrier_backoff_multipliers: HashMap::from([("T-Mobile".to_string(), 2.0)]),
        ..Default::default()
    });

    let mut delays = Vec::new();
    for _ in 0..3 {
        match scheduler.record_failure("m1", "c1", "timeout", Some("T-Mobile")) {
            RetryDecision::Retry { delay_seconds, .. } => delays.push(delay_seconds),
            other => panic!("expected Retry, got {:?}", other),
        }
    }
    assert_eq!(delays, vec![4.0, 8.0, 16.0]);
}

#[test]
fn backoff_cap_applies_before_jitter() {
    let scheduler = RetryScheduler::new(RetryConfig {
        max_delay_seconds: 10.0,
        ..Default::default()
    });

    // 2 * 2^4 = 32, capped at 10, jittered ±20%.
    for _ in 0..100 {
        let d = scheduler.retry_delay_seconds(5, None);
        assert!(d <= 12.0, "delay {} above jittered cap", d);
        assert!(d >= 8.0, "delay {} below jittered cap", d);
    }
}

#[test]
fn permanent_classification_matches_decision() {
    let scheduler = RetryScheduler::new(config());

    assert_eq!(classify("recipient does not exist"), ErrorType::Permanent);
    match scheduler.record_failure("m1", "c1", "recipient does not exist", None) {
        RetryDecision::GiveUp { reason, .. } => {
            assert_eq!(reason, GiveUpReason::PermanentError);
        }
        other => panic!("expected GiveUp, got {:?}", other),
    }
    assert_eq!(
        scheduler.message_state("m1"),
        Some(MessageState::PermanentlyFailed)
    );
}

#[test]
fn stats_track_campaigns_separately() {
    let scheduler = RetryScheduler::new(config());

    scheduler.record_failure("m1", "c1", "timeout", None);
    scheduler.record_failure("m2", "c1", "429", None);
    scheduler.record_failure("m3", "c2", "timeout", None);

    let c1 = scheduler.stats("c1");
    assert_eq!(c1.pending_retries, 2);
    assert_eq!(c1.retries_by_error_type.get("temporary"), Some(&1));
    assert_eq!(c1.retries_by_error_type.get("rate_limit"), Some(&1));

    let c2 = scheduler.stats("c2");
    assert_eq!(c2.pending_retries, 1);
}
