mod common;

use common::{flaky_builder, record};
use quarry_cache::{BackoffPolicy, ExponentialBackoff, FixedBackoff};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_lookup_retries_then_succeeds() {
  let calls = Arc::new(AtomicUsize::new(0));
  // Attempts 0 and 1 fail, attempt 2 resolves.
  let cache = flaky_builder(calls.clone(), 2).build_async().unwrap();

  let value = cache.get(&1).await;
  assert_eq!(value.as_deref(), Some(&record(1)));
  assert_eq!(
    calls.load(Ordering::SeqCst),
    3,
    "two failed attempts plus the succeeding one"
  );

  let metrics = cache.metrics();
  assert_eq!(metrics.executor_calls, 3);
  assert_eq!(metrics.executor_failures, 2);
  assert_eq!(metrics.batches, 1);
}

#[tokio::test]
async fn test_lookup_settles_absent_after_exhausted_retries() {
  let calls = Arc::new(AtomicUsize::new(0));
  // More failures than the attempt budget: every attempt errors.
  let cache = flaky_builder(calls.clone(), usize::MAX)
    .max_attempts(4)
    .build_async()
    .unwrap();

  let value = cache.get(&1).await;
  assert_eq!(value, None, "exhausted retries surface as absent, not a panic");
  assert_eq!(calls.load(Ordering::SeqCst), 4);

  // The failure is cached like any other absent outcome.
  assert_eq!(cache.get(&1).await, None);
  assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_attempt_budget_of_one_disables_retries() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = flaky_builder(calls.clone(), usize::MAX)
    .max_attempts(1)
    .build_async()
    .unwrap();

  assert_eq!(cache.get(&1).await, None);
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_batch_does_not_poison_later_lookups() {
  let calls = Arc::new(AtomicUsize::new(0));
  // The first four attempts (one full batch) fail, then the remote recovers.
  let cache = flaky_builder(calls.clone(), 4)
    .max_attempts(4)
    .cache_not_found(false)
    .build_async()
    .unwrap();

  assert_eq!(cache.get(&1).await, None);
  assert_eq!(calls.load(Ordering::SeqCst), 4);

  let value = cache.get(&1).await;
  assert_eq!(value.as_deref(), Some(&record(1)));
  assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn test_exponential_backoff_doubles_from_base() {
  let backoff = ExponentialBackoff::new(Duration::from_millis(100));
  assert_eq!(backoff.delay(0), Duration::from_millis(100));
  assert_eq!(backoff.delay(1), Duration::from_millis(200));
  assert_eq!(backoff.delay(2), Duration::from_millis(400));
  assert_eq!(backoff.delay(3), Duration::from_millis(800));
}

#[test]
fn test_exponential_backoff_respects_its_cap() {
  let backoff = ExponentialBackoff::new(Duration::from_millis(100)).with_cap(Duration::from_millis(250));
  assert_eq!(backoff.delay(0), Duration::from_millis(100));
  assert_eq!(backoff.delay(1), Duration::from_millis(200));
  assert_eq!(backoff.delay(2), Duration::from_millis(250));
  assert_eq!(backoff.delay(60), Duration::from_millis(250), "huge attempt indexes saturate");
}

#[test]
fn test_backoff_is_monotonically_non_decreasing() {
  let backoff = ExponentialBackoff::default();
  let mut previous = Duration::ZERO;
  for attempt in 0..40 {
    let delay = backoff.delay(attempt);
    assert!(delay >= previous, "delay shrank at attempt {attempt}");
    previous = delay;
  }
}

#[test]
fn test_fixed_backoff_is_constant() {
  let backoff = FixedBackoff(Duration::from_millis(7));
  assert_eq!(backoff.delay(0), Duration::from_millis(7));
  assert_eq!(backoff.delay(9), Duration::from_millis(7));
}
