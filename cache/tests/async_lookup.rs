mod common;

use common::{filtering_builder, record, resolving_builder, Record};
use quarry_cache::{CacheBuilder, FetchError, FixedBackoff, Outcome};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;

#[tokio::test]
async fn test_concurrent_lookups_share_one_fetch() {
  let calls = Arc::new(AtomicUsize::new(0));
  let num_tasks = 16;

  let cache = Arc::new(resolving_builder(calls.clone()).build_async().unwrap());
  let barrier = Arc::new(Barrier::new(num_tasks));

  let mut tasks = vec![];
  for _ in 0..num_tasks {
    let cache = cache.clone();
    let barrier = barrier.clone();
    tasks.push(tokio::spawn(async move {
      // All tasks request the same missing key at once.
      barrier.wait().await;
      let value = cache.get(&7).await;
      assert_eq!(value.as_deref(), Some(&record(7)));
    }));
  }
  for task in tasks {
    task.await.unwrap();
  }

  assert_eq!(
    calls.load(Ordering::SeqCst),
    1,
    "concurrent lookups for one key must share a single executor call"
  );
}

#[tokio::test]
async fn test_resolved_keys_answer_from_memory() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = resolving_builder(calls.clone()).build_async().unwrap();

  let first = cache.get(&3).await;
  assert_eq!(first.as_deref(), Some(&record(3)));
  assert_eq!(calls.load(Ordering::SeqCst), 1);

  for _ in 0..5 {
    let again = cache.get(&3).await;
    assert_eq!(again.as_deref(), Some(&record(3)));
  }
  assert_eq!(
    calls.load(Ordering::SeqCst),
    1,
    "resolved keys must not reach the executor again"
  );

  let metrics = cache.metrics();
  assert_eq!(metrics.misses, 1);
  assert_eq!(metrics.hits, 5);
  assert_eq!(metrics.batches, 1);
  assert_eq!(metrics.keys_found, 1);
}

#[tokio::test]
async fn test_partial_batch_settles_every_key() {
  let calls = Arc::new(AtomicUsize::new(0));
  // Key 2 is absent upstream.
  let cache = filtering_builder(calls.clone(), |id| id != 2)
    .build_async()
    .unwrap();

  let results = cache.get_many([1, 2, 3]).await;
  assert_eq!(results[0].as_deref(), Some(&record(1)));
  assert_eq!(results[1], None);
  assert_eq!(results[2].as_deref(), Some(&record(3)));

  assert_eq!(
    calls.load(Ordering::SeqCst),
    1,
    "all three keys must settle from one executor call"
  );

  let metrics = cache.metrics();
  assert_eq!(metrics.keys_found, 2);
  assert_eq!(metrics.keys_not_found, 1);
}

#[tokio::test]
async fn test_absent_keys_are_cached_by_default() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = filtering_builder(calls.clone(), |_| false).build_async().unwrap();

  assert_eq!(cache.get(&2).await, None);
  assert_eq!(cache.get(&2).await, None);
  assert_eq!(
    calls.load(Ordering::SeqCst),
    1,
    "a cached absent result must not be fetched again"
  );
  assert!(matches!(cache.peek(&2), Some(Outcome::NotFound)));
}

#[tokio::test]
async fn test_absent_keys_refetch_when_negative_caching_is_off() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = filtering_builder(calls.clone(), |_| false)
    .cache_not_found(false)
    .build_async()
    .unwrap();

  assert_eq!(cache.get(&2).await, None);
  assert_eq!(cache.get(&2).await, None);
  assert_eq!(
    calls.load(Ordering::SeqCst),
    2,
    "with negative caching off, each lookup must fetch again"
  );
  assert!(cache.peek(&2).is_none());
}

#[tokio::test]
async fn test_cancelled_waiter_does_not_disturb_others() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = {
    let calls = calls.clone();
    CacheBuilder::default()
      .batch_window(Duration::from_millis(20))
      .executor(move |keys: &[u64]| {
        calls.fetch_add(1, Ordering::SeqCst);
        // Slow remote call, so cancellation happens mid-flight.
        std::thread::sleep(Duration::from_millis(100));
        Ok(keys.iter().map(|&id| record(id)).collect())
      })
      .key_of(|record: &Record| record.id)
      .build_async()
      .unwrap()
  };

  let cancelled = cache.get(&9);
  let kept = cache.get(&9);
  drop(cancelled);

  let value = kept.await;
  assert_eq!(
    value.as_deref(),
    Some(&record(9)),
    "the surviving waiter must still receive the resolved value"
  );
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalidate_forces_a_refetch() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = resolving_builder(calls.clone()).build_async().unwrap();

  assert!(cache.get(&5).await.is_some());
  assert_eq!(cache.len(), 1);

  assert!(cache.invalidate(&5));
  assert!(cache.peek(&5).is_none());
  assert!(cache.is_empty());

  assert!(cache.get(&5).await.is_some());
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(cache.metrics().invalidations, 1);
}

#[tokio::test]
async fn test_bulk_lookup_batches_the_uncached_residue() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = resolving_builder(calls.clone()).build_async().unwrap();

  assert!(cache.get(&1).await.is_some());
  assert_eq!(calls.load(Ordering::SeqCst), 1);

  let results = cache.get_many([1, 2, 3]).await;
  assert!(results.iter().all(|value| value.is_some()));
  assert_eq!(
    calls.load(Ordering::SeqCst),
    2,
    "the cached key must be skipped and the rest drafted together"
  );
}

#[tokio::test]
async fn test_async_executor_runs_on_the_ambient_runtime() {
  let calls = Arc::new(AtomicUsize::new(0));
  let cache = {
    let calls = calls.clone();
    CacheBuilder::default()
      .batch_window(Duration::from_millis(20))
      .backoff(FixedBackoff(Duration::from_millis(2)))
      .async_executor(move |keys: Vec<u64>| {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(10)).await;
          Ok::<_, FetchError>(keys.into_iter().map(record).collect())
        }
      })
      .key_of(|record: &Record| record.id)
      .build_async()
      .unwrap()
  };

  let results = cache.get_many([10, 11]).await;
  assert_eq!(results[0].as_deref(), Some(&record(10)));
  assert_eq!(results[1].as_deref(), Some(&record(11)));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}
