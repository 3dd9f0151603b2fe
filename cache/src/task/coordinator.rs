use crate::executor::{KeyExtractor, PreparedExecutor};
use crate::metrics::Metrics;
use crate::outcome::Outcome;
use crate::pending::PendingRegistry;
use crate::store::ShardedStore;
use crate::task::retry::{Batch, RetryController};

use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ahash::HashMap;

/// A context object holding the thread-safe parts of the cache that the
/// coordinator needs to access.
pub(crate) struct CoordinatorContext<K, V, H> {
  pub(crate) store: Arc<ShardedStore<K, V, H>>,
  pub(crate) pending: Arc<PendingRegistry<K, V>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) executor: PreparedExecutor<K, V>,
  pub(crate) key_of: Arc<KeyExtractor<K, V>>,
  pub(crate) retry: RetryController,
  pub(crate) cache_not_found: bool,
}

/// The background task that drafts queued keys into batches, drives them
/// through the executor, and fans results back out to waiters.
///
/// The coordinator is the single owner of batching: it never re-enters
/// itself, and it blocks during executor calls and backoff sleeps without
/// affecting callers, who only touch the registry and the store.
pub(crate) struct Coordinator {
  _handle: JoinHandle<()>, // Thread exits shortly after the stop flag is set.
  stop_flag: Arc<AtomicBool>,
}

impl Coordinator {
  /// Spawns the coordinator thread.
  pub(crate) fn spawn<K, V, H>(
    context: CoordinatorContext<K, V, H>,
    batch_window: Duration,
    idle_interval: Duration,
  ) -> Self
  where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    H: BuildHasher + Clone + Send + Sync + 'static,
  {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop = stop_flag.clone();

    let handle = thread::spawn(move || {
      loop {
        if !context.pending.wait_for_work(idle_interval, &stop) {
          break;
        }

        // Linger briefly so lookups racing in right now land in this draft
        // instead of the next cycle.
        thread::sleep(batch_window);

        let keys = context.pending.drain_queued();
        if keys.is_empty() {
          continue;
        }
        if stop.load(Ordering::Relaxed) {
          break;
        }

        Self::settle_batch(&context, keys, &stop);
      }

      // Anything still pending on the way out settles absent rather than
      // leaving its waiters parked forever.
      context.pending.fail_all();
    });

    Self {
      _handle: handle,
      stop_flag,
    }
  }

  /// Runs one batch to settlement: executor with retries, store writes, then
  /// FIFO fan-out to every key's waiters.
  fn settle_batch<K, V, H>(context: &CoordinatorContext<K, V, H>, keys: Vec<K>, stop: &AtomicBool)
  where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    H: BuildHasher + Clone + Send + Sync + 'static,
  {
    let mut batch = Batch::new(keys);
    context.metrics.batches.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(keys = batch.keys.len(), "dispatching lookup batch");

    let values = context
      .retry
      .run(&mut batch, &context.executor, &context.metrics, stop);

    // Index the returned values by their extracted key so each requested key
    // can be settled independently.
    let mut resolved: HashMap<K, Arc<V>> = HashMap::default();
    if let Some(values) = values {
      for value in values {
        let key = (context.key_of)(&value);
        resolved.insert(key, Arc::new(value));
      }
    }

    let total = batch.keys.len();
    let mut found = 0usize;
    for key in batch.keys.iter() {
      let outcome = match resolved.remove(key) {
        Some(value) => {
          found += 1;
          context.metrics.keys_found.fetch_add(1, Ordering::Relaxed);
          Outcome::Found(value)
        }
        None => {
          context.metrics.keys_not_found.fetch_add(1, Ordering::Relaxed);
          Outcome::NotFound
        }
      };

      // The store write must precede registry removal: a lookup racing with
      // settlement then always observes either the pending entry or the
      // stored outcome.
      if outcome.is_found() || context.cache_not_found {
        context.store.insert(key.clone(), outcome.clone());
      }
      if let Some(state) = context.pending.settle_remove(key) {
        state.complete(outcome);
      }
    }

    tracing::debug!(total, found, "lookup batch settled");
  }

  /// Signals the coordinator thread to stop.
  pub(crate) fn stop(self) {
    self.stop_flag.store(true, Ordering::Relaxed);
  }
}
