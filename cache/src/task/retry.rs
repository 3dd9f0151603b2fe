use crate::backoff::BackoffPolicy;
use crate::executor::PreparedExecutor;
use crate::metrics::Metrics;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// An immutable snapshot of keys drafted together into a single executor
/// invocation, plus the attempt counter for that invocation's retries.
pub(crate) struct Batch<K> {
  pub(crate) keys: Box<[K]>,
  pub(crate) attempt: u32,
}

impl<K> Batch<K> {
  pub(crate) fn new(keys: Vec<K>) -> Self {
    Self {
      keys: keys.into_boxed_slice(),
      attempt: 0,
    }
  }
}

/// Wraps executor invocations for one batch in retry-with-backoff.
///
/// Attempt 0 runs immediately. A failed attempt `i` sleeps
/// `backoff.delay(i)` and retries the same key set; a success
/// short-circuits. The batch is never split or partially resubmitted.
pub(crate) struct RetryController {
  pub(crate) backoff: Arc<dyn BackoffPolicy>,
  pub(crate) max_attempts: u32,
}

impl RetryController {
  /// Runs the batch to settlement. Returns the executor's values on success,
  /// or `None` once `max_attempts` attempts have failed (or a stop was
  /// requested mid-retry).
  pub(crate) fn run<K, V>(
    &self,
    batch: &mut Batch<K>,
    executor: &PreparedExecutor<K, V>,
    metrics: &Metrics,
    stop: &AtomicBool,
  ) -> Option<Vec<V>>
  where
    K: Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
  {
    loop {
      metrics.executor_calls.fetch_add(1, Ordering::Relaxed);
      match executor.dispatch(&batch.keys) {
        Ok(values) => return Some(values),
        Err(error) => {
          metrics.executor_failures.fetch_add(1, Ordering::Relaxed);
          let failed = batch.attempt;
          batch.attempt += 1;

          if batch.attempt >= self.max_attempts {
            tracing::warn!(
              attempts = self.max_attempts,
              "batch failed permanently: {}",
              error
            );
            return None;
          }
          if stop.load(Ordering::Relaxed) {
            return None;
          }

          let delay = self.backoff.delay(failed);
          tracing::warn!(
            attempt = failed,
            delay_ms = delay.as_millis() as u64,
            "batch attempt failed, retrying: {}",
            error
          );
          thread::sleep(delay);
        }
      }
    }
  }
}
