use crate::lookup::{self, LookupState};
use crate::metrics::Metrics;
use crate::outcome::Outcome;
use crate::pending::{JoinResult, PendingRegistry};
use crate::store::ShardedStore;
use crate::task::coordinator::Coordinator;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// The internal, thread-safe core of the cache.
pub(crate) struct CacheShared<K: Send, V: Send + Sync, H> {
  pub(crate) store: Arc<ShardedStore<K, V, H>>,
  pub(crate) pending: Arc<PendingRegistry<K, V>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) coordinator: Option<Coordinator>,
}

impl<K: Send, V: Send + Sync, H> fmt::Debug for CacheShared<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("store", &self.store)
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K: Send, V: Send + Sync, H> Drop for CacheShared<K, V, H> {
  fn drop(&mut self) {
    if let Some(coordinator) = self.coordinator.take() {
      coordinator.stop();
      // The coordinator may be idling on the registry condvar; wake it so it
      // observes the stop promptly and settles any leftover waiters.
      self.pending.wake_all();
    }
  }
}

impl<K, V, H> CacheShared<K, V, H>
where
  K: Eq + Hash + Clone + Send,
  V: Send + Sync,
  H: BuildHasher + Clone,
{
  /// The lookup path shared by both handles: an optimistic store read, then
  /// a registry attach with the store re-checked under the registry lock.
  ///
  /// The returned state is already settled for cache hits, so callers never
  /// suspend for a resolved key.
  pub(crate) fn lookup(&self, key: &K) -> Arc<LookupState<V>> {
    if let Some(outcome) = self.store.get(key) {
      self.metrics.hits.fetch_add(1, Ordering::Relaxed);
      return lookup::settled(outcome);
    }

    match self.pending.join_or_lead(key, || self.store.get(key)) {
      JoinResult::Cached(outcome) => {
        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        lookup::settled(outcome)
      }
      JoinResult::Joined(state) => {
        self.metrics.coalesced.fetch_add(1, Ordering::Relaxed);
        state
      }
      JoinResult::Led(state) => {
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        state
      }
    }
  }

  /// Non-suspending store probe. Does not count as a hit or miss.
  pub(crate) fn peek(&self, key: &K) -> Option<Outcome<V>> {
    self.store.get(key)
  }

  /// Removes the settled outcome for `key`, returning whether one existed.
  /// In-flight work for the key is unaffected.
  pub(crate) fn invalidate(&self, key: &K) -> bool {
    if self.store.remove(key).is_some() {
      self.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
      true
    } else {
      false
    }
  }
}
