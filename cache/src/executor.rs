use crate::error::FetchError;
use crate::runtime::TaskSpawner;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fibre::mpsc;

/// Extracts the key a resolved value corresponds to. Must be pure.
pub(crate) type KeyExtractor<K, V> = dyn Fn(&V) -> K + Send + Sync;

pub(crate) type SyncExecutorFn<K, V> = dyn Fn(&[K]) -> Result<Vec<V>, FetchError> + Send + Sync;

pub(crate) type BoxedFetch<V> = Pin<Box<dyn Future<Output = Result<Vec<V>, FetchError>> + Send>>;

pub(crate) type AsyncExecutorFn<K, V> = dyn Fn(Vec<K>) -> BoxedFetch<V> + Send + Sync;

/// The remote batch executor as configured on the builder.
///
/// Stored type-erased so the builder and cache need no generics over the
/// closure type. The function may be invoked repeatedly with the same key set
/// (retries) and must not assume prior partial state.
pub(crate) enum Executor<K, V> {
  Sync(Arc<SyncExecutorFn<K, V>>),
  Async(Arc<AsyncExecutorFn<K, V>>),
}

/// An executor paired with everything it needs at dispatch time.
///
/// The async variant is bound to its spawner during `build`, so dispatch
/// never has to deal with a missing runtime.
pub(crate) enum PreparedExecutor<K, V> {
  Sync(Arc<SyncExecutorFn<K, V>>),
  Async {
    run: Arc<AsyncExecutorFn<K, V>>,
    spawner: Arc<dyn TaskSpawner>,
  },
}

impl<K, V> PreparedExecutor<K, V>
where
  K: Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Runs one executor attempt for `keys`, blocking the calling (coordinator)
  /// thread until it settles.
  ///
  /// A sync executor runs inline. An async executor is spawned onto the
  /// configured runtime and its result is carried back over a one-slot
  /// channel; the receive also fails if the runtime drops the task, which is
  /// reported as an ordinary attempt failure.
  pub(crate) fn dispatch(&self, keys: &[K]) -> Result<Vec<V>, FetchError> {
    match self {
      PreparedExecutor::Sync(run) => run(keys),
      PreparedExecutor::Async { run, spawner } => {
        let (tx, rx) = mpsc::bounded::<Result<Vec<V>, FetchError>>(1);
        let fetch = run(keys.to_vec());
        spawner.spawn(Box::pin(async move {
          let result = fetch.await;
          let _ = tx.try_send(result);
        }));
        match rx.recv() {
          Ok(result) => result,
          Err(_) => Err("executor task was dropped before settling".into()),
        }
      }
    }
  }
}
