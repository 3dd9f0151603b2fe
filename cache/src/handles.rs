use crate::lookup::{LookupState, State, Waiter};
use crate::metrics::MetricsSnapshot;
use crate::outcome::Outcome;
use crate::shared::CacheShared;

use std::future::Future;
use std::hash::{BuildHasher, Hash};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future;

/// A thread-safe lookup cache with a blocking API.
///
/// `get` suspends the calling thread until the key settles; repeat lookups
/// for resolved keys return without blocking.
#[derive(Debug)]
pub struct Cache<K: Send, V: Send + Sync, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<K, V, H>>,
}

/// A thread-safe lookup cache with an asynchronous API.
///
/// `get` returns a [`Lookup`] future. Dropping the future cancels only that
/// caller's wait; the batch, and every other waiter for the same key, proceed
/// unaffected.
#[derive(Debug)]
pub struct AsyncCache<K: Send, V: Send + Sync, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<K, V, H>>,
}

/// A pending lookup for a single key.
///
/// Resolves to `Some(value)` once the batch containing the key settles with a
/// match, or `None` when the key is absent upstream or its batch exhausted
/// its retries. Dropping the future is the cancellation signal.
pub struct Lookup<V> {
  state: Arc<LookupState<V>>,
}

impl<V> Future for Lookup<V> {
  type Output = Option<Arc<V>>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut inner = self.state.inner.lock();
    match &inner.state {
      State::Settled(outcome) => Poll::Ready(outcome.value()),
      State::Pending => {
        inner.waiters.push_back(Waiter::Async(cx.waker().clone()));
        Poll::Pending
      }
    }
  }
}

impl<K, V, H> Cache<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone,
{
  /// Looks up `key`, blocking until it resolves.
  ///
  /// Returns the cached value immediately when one exists. Otherwise the
  /// calling thread parks until the coordinator settles the key; `None`
  /// means the key is absent upstream or every fetch attempt failed.
  pub fn get(&self, key: &K) -> Option<Arc<V>> {
    self.shared.lookup(key).wait_blocking().value()
  }

  /// Looks up many keys, blocking until all of them resolve.
  ///
  /// Every key is registered before any wait begins, so the uncached keys of
  /// one call share a single batch. Results are in input order.
  pub fn get_many<I>(&self, keys: I) -> Vec<Option<Arc<V>>>
  where
    I: IntoIterator<Item = K>,
  {
    let states: Vec<_> = keys
      .into_iter()
      .map(|key| self.shared.lookup(&key))
      .collect();
    states
      .into_iter()
      .map(|state| state.wait_blocking().value())
      .collect()
  }

  /// Returns the settled outcome for `key` without suspending or triggering
  /// network work. `None` means the key has never settled.
  pub fn peek(&self, key: &K) -> Option<Outcome<V>> {
    self.shared.peek(key)
  }

  /// Removes the settled outcome for `key` so a later lookup re-fetches it.
  /// Returns `true` if an outcome was removed.
  pub fn invalidate(&self, key: &K) -> bool {
    self.shared.invalidate(key)
  }

  /// The number of settled entries currently in the store.
  pub fn len(&self) -> usize {
    self.shared.store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// A point-in-time snapshot of the cache's metrics.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }

  /// Converts this synchronous `Cache` into an asynchronous `AsyncCache`.
  /// This is a zero-cost conversion.
  pub fn to_async(self) -> AsyncCache<K, V, H> {
    AsyncCache {
      shared: self.shared.clone(),
    }
  }
}

impl<K, V, H> AsyncCache<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone,
{
  /// Looks up `key`, returning a future that resolves when it settles.
  ///
  /// The key is registered (and queued, if new) inside this call, not on
  /// first poll, so lookups issued together share a draft even before they
  /// are awaited. Cache hits resolve on the first poll without suspending.
  pub fn get(&self, key: &K) -> Lookup<V> {
    Lookup {
      state: self.shared.lookup(key),
    }
  }

  /// Looks up many keys concurrently. Results are in input order.
  ///
  /// All keys are registered up front, so the uncached residue of one call
  /// lands in a single batch.
  pub async fn get_many<I>(&self, keys: I) -> Vec<Option<Arc<V>>>
  where
    I: IntoIterator<Item = K>,
  {
    let lookups: Vec<Lookup<V>> = keys.into_iter().map(|key| self.get(&key)).collect();
    future::join_all(lookups).await
  }

  /// Returns the settled outcome for `key` without suspending or triggering
  /// network work.
  pub fn peek(&self, key: &K) -> Option<Outcome<V>> {
    self.shared.peek(key)
  }

  /// Removes the settled outcome for `key` so a later lookup re-fetches it.
  pub fn invalidate(&self, key: &K) -> bool {
    self.shared.invalidate(key)
  }

  /// The number of settled entries currently in the store.
  pub fn len(&self) -> usize {
    self.shared.store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// A point-in-time snapshot of the cache's metrics.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }

  /// Converts this asynchronous `AsyncCache` into a synchronous `Cache`.
  /// This is a zero-cost conversion.
  pub fn to_sync(self) -> Cache<K, V, H> {
    Cache {
      shared: self.shared.clone(),
    }
  }
}
