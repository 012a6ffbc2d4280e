//! Tests for the exponential backoff retry policy.

use emrcost::error::{EmrCostError, IsRetryable};
use emrcost::retry::{ExponentialBackoffPolicy, NoRetryPolicy, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

fn fast_policy(max_attempts: u32) -> ExponentialBackoffPolicy {
    ExponentialBackoffPolicy::with_delays(
        max_attempts,
        Duration::from_millis(10),
        Duration::from_millis(25),
    )
}

#[tokio::test]
async fn succeeds_immediately_without_backoff() {
    let policy = fast_policy(3);
    let call_count = AtomicU32::new(0);

    let result = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok::<String, EmrCostError>("success".to_string())
        })
        .await;

    assert_eq!(result.unwrap(), "success");
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_throttling_until_success() {
    let policy = fast_policy(5);
    let call_count = AtomicU32::new(0);

    let started = Instant::now();
    let result = policy
        .execute_with_retry(|| async {
            let count = call_count.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                Err(EmrCostError::Throttling("Rate exceeded".to_string()))
            } else {
                Ok::<&str, EmrCostError>("done")
            }
        })
        .await;
    let elapsed = started.elapsed();

    assert_eq!(result.unwrap(), "done");
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
    // Two backoff waits: 10ms then 20ms, plus jitter up to the 25ms cap each
    assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn non_retryable_errors_fail_fast() {
    let policy = fast_policy(5);
    let call_count = AtomicU32::new(0);

    let result: Result<(), _> = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err(EmrCostError::MissingPrice("m4.large".to_string()))
        })
        .await;

    assert!(matches!(result, Err(EmrCostError::MissingPrice(_))));
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_retries_surface_the_cap() {
    let policy = ExponentialBackoffPolicy::with_delays(
        3,
        Duration::from_millis(1),
        Duration::from_millis(2),
    );
    let call_count = AtomicU32::new(0);

    let result: Result<(), _> = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err(EmrCostError::Throttling("Rate exceeded".to_string()))
        })
        .await;

    match result {
        Err(EmrCostError::RetriesExhausted { attempts, source }) => {
            assert_eq!(attempts, 3);
            assert!(source.is_retryable());
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn no_retry_policy_passes_through() {
    let policy = NoRetryPolicy;
    let call_count = AtomicU32::new(0);

    let result: Result<(), _> = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err(EmrCostError::Throttling("Rate exceeded".to_string()))
        })
        .await;

    assert!(matches!(result, Err(EmrCostError::Throttling(_))));
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}
