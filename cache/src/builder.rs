use crate::backoff::{BackoffPolicy, ExponentialBackoff};
use crate::error::{BuildError, FetchError};
use crate::executor::{BoxedFetch, Executor, KeyExtractor, PreparedExecutor};
use crate::handles::{AsyncCache, Cache};
use crate::metrics::Metrics;
use crate::pending::PendingRegistry;
use crate::shared::CacheShared;
use crate::store::ShardedStore;
use crate::task::coordinator::{Coordinator, CoordinatorContext};
use crate::task::retry::RetryController;
use crate::TaskSpawner;

use core::fmt;
use std::future::Future;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// A builder for creating `Cache` and `AsyncCache` instances.
///
/// An executor and a key extractor are mandatory; everything else has
/// defaults suitable for remote lookups in the tens-of-milliseconds range.
pub struct CacheBuilder<K: Send, V: Send + Sync, H = ahash::RandomState> {
  pub(crate) shards: usize,
  pub(crate) hasher: H,
  pub(crate) max_attempts: u32,
  pub(crate) batch_window: Duration,
  pub(crate) idle_interval: Duration,
  pub(crate) cache_not_found: bool,
  executor: Option<Executor<K, V>>,
  key_of: Option<Arc<KeyExtractor<K, V>>>,
  backoff: Option<Arc<dyn BackoffPolicy>>,
  spawner: Option<Arc<dyn TaskSpawner>>,
  _key_marker: PhantomData<K>,
  _value_marker: PhantomData<V>,
}

// Manual Debug implementation for CacheBuilder.
impl<K: Send, V: Send + Sync, H> fmt::Debug for CacheBuilder<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("shards", &self.shards)
      .field("max_attempts", &self.max_attempts)
      .field("batch_window", &self.batch_window)
      .field("idle_interval", &self.idle_interval)
      .field("cache_not_found", &self.cache_not_found)
      .field("has_executor", &self.executor.is_some())
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
// This impl block has no restrictive bounds on K or V.
impl<K: Send, V: Send + Sync, H> CacheBuilder<K, V, H> {
  /// Sets the number of concurrent store shards to use.
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = shards.max(1);
    self
  }

  /// Sets the total attempt budget per batch, the first try included.
  ///
  /// The default of 4 gives one immediate attempt plus three retries.
  pub fn max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts;
    self
  }

  /// Sets how long the coordinator lingers after waking before drafting a
  /// batch, which is the window in which concurrent lookups coalesce.
  ///
  /// Defaults to 10 milliseconds.
  pub fn batch_window(mut self, window: Duration) -> Self {
    self.batch_window = window;
    self
  }

  /// Sets the upper bound on how long the idle coordinator sleeps between
  /// re-checks when no lookup wakes it. Defaults to 250 milliseconds.
  pub fn idle_interval(mut self, interval: Duration) -> Self {
    self.idle_interval = interval;
    self
  }

  /// Controls whether absent results are cached.
  ///
  /// When `true` (the default), a key that settles `NotFound` answers later
  /// lookups from memory until invalidated. When `false`, every new lookup
  /// for such a key is fetched again.
  pub fn cache_not_found(mut self, cache: bool) -> Self {
    self.cache_not_found = cache;
    self
  }

  /// Sets the backoff policy consulted between retry attempts.
  ///
  /// Defaults to [`ExponentialBackoff::default()`], 100 ms doubling.
  pub fn backoff<B>(mut self, backoff: B) -> Self
  where
    B: BackoffPolicy + 'static,
  {
    self.backoff = Some(Arc::new(backoff));
    self
  }

  /// Sets the synchronous batch executor.
  ///
  /// The closure receives the drafted keys and performs one remote call on
  /// the coordinator thread. It may be invoked repeatedly with the same key
  /// set when attempts fail.
  pub fn executor(
    mut self,
    f: impl Fn(&[K]) -> Result<Vec<V>, FetchError> + Send + Sync + 'static,
  ) -> Self {
    self.executor = Some(Executor::Sync(Arc::new(f)));
    self
  }

  /// Sets the asynchronous batch executor.
  ///
  /// The future runs on the configured [`TaskSpawner`] (or the ambient Tokio
  /// runtime under the `tokio` feature).
  pub fn async_executor<F, Fut>(mut self, f: F) -> Self
  where
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<V>, FetchError>> + Send + 'static,
  {
    let executor_fn = move |keys: Vec<K>| Box::pin(f(keys)) as BoxedFetch<V>;
    self.executor = Some(Executor::Async(Arc::new(executor_fn)));
    self
  }

  /// Sets the key extractor used to match returned values back to the keys
  /// that requested them. Must be pure.
  pub fn key_of(mut self, f: impl Fn(&V) -> K + Send + Sync + 'static) -> Self {
    self.key_of = Some(Arc::new(f));
    self
  }

  pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }
}

// --- Default Constructor ---
impl<K: Send, V: Send + Sync, H: BuildHasher + Default> CacheBuilder<K, V, H> {
  /// Creates a new `CacheBuilder` with default settings.
  pub fn new() -> Self {
    Self {
      shards: (num_cpus::get() * 4).max(1).next_power_of_two(),
      hasher: H::default(),
      max_attempts: 4,
      batch_window: Duration::from_millis(10),
      idle_interval: Duration::from_millis(250),
      cache_not_found: true,
      executor: None,
      key_of: None,
      backoff: None,
      spawner: None,
      _key_marker: PhantomData,
      _value_marker: PhantomData,
    }
  }
}

impl<K: Send, V: Send + Sync> Default for CacheBuilder<K, V, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(feature = "rapidhash")]
impl<K: Send, V: Send + Sync> CacheBuilder<K, V, rapidhash::RapidRandomState> {
  pub fn rapidhash() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
// This impl block contains the full set of trait bounds required to actually
// construct the cache, including everything the coordinator thread captures.
impl<K, V, H> CacheBuilder<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Sets the hasher for the store shards.
  pub fn hasher(mut self, hasher: H) -> Self {
    self.hasher = hasher;
    self
  }

  /// Builds a synchronous `Cache`.
  pub fn build(mut self) -> Result<Cache<K, V, H>, BuildError> {
    self.validate()?;
    let shared = self.build_shared_core()?;
    Ok(Cache { shared })
  }

  /// Builds an asynchronous `AsyncCache`.
  pub fn build_async(mut self) -> Result<AsyncCache<K, V, H>, BuildError> {
    self.validate()?;
    let shared = self.build_shared_core()?;
    Ok(AsyncCache { shared })
  }

  /// Central logic to construct the shared core of the cache and spawn its
  /// coordinator.
  fn build_shared_core(&mut self) -> Result<Arc<CacheShared<K, V, H>>, BuildError> {
    let mut spawner = self.spawner.take();
    if matches!(self.executor, Some(Executor::Async(_))) && spawner.is_none() {
      #[cfg(feature = "tokio")]
      {
        spawner = Some(Arc::new(crate::runtime::TokioSpawner::new()));
      }
      #[cfg(not(feature = "tokio"))]
      {
        return Err(BuildError::SpawnerRequired);
      }
    }

    let executor = match self.executor.take().ok_or(BuildError::MissingExecutor)? {
      Executor::Sync(run) => PreparedExecutor::Sync(run),
      Executor::Async(run) => PreparedExecutor::Async {
        run,
        spawner: spawner.ok_or(BuildError::SpawnerRequired)?,
      },
    };
    let key_of = self.key_of.take().ok_or(BuildError::MissingKeyExtractor)?;

    let store = Arc::new(ShardedStore::new(self.shards, self.hasher.clone()));
    let pending = Arc::new(PendingRegistry::new());
    let metrics = Arc::new(Metrics::new());

    let retry = RetryController {
      backoff: self
        .backoff
        .take()
        .unwrap_or_else(|| Arc::new(ExponentialBackoff::default())),
      max_attempts: self.max_attempts,
    };

    let coordinator = Coordinator::spawn(
      CoordinatorContext {
        store: Arc::clone(&store),
        pending: Arc::clone(&pending),
        metrics: Arc::clone(&metrics),
        executor,
        key_of,
        retry,
        cache_not_found: self.cache_not_found,
      },
      self.batch_window,
      self.idle_interval,
    );

    Ok(Arc::new(CacheShared {
      store,
      pending,
      metrics,
      coordinator: Some(coordinator),
    }))
  }

  /// Validates the builder configuration.
  fn validate(&self) -> Result<(), BuildError> {
    if self.shards == 0 {
      return Err(BuildError::ZeroShards);
    }
    if self.max_attempts == 0 {
      return Err(BuildError::ZeroAttempts);
    }
    if self.executor.is_none() {
      return Err(BuildError::MissingExecutor);
    }
    if self.key_of.is_none() {
      return Err(BuildError::MissingKeyExtractor);
    }
    Ok(())
  }
}
