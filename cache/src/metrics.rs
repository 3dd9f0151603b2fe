use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for the cache.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub struct Metrics {
  // --- Lookup traffic ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,
  pub(crate) coalesced: CachePadded<AtomicU64>,

  // --- Batch / executor activity ---
  pub(crate) batches: CachePadded<AtomicU64>,
  pub(crate) executor_calls: CachePadded<AtomicU64>,
  pub(crate) executor_failures: CachePadded<AtomicU64>,

  // --- Settlements ---
  pub(crate) keys_found: CachePadded<AtomicU64>,
  pub(crate) keys_not_found: CachePadded<AtomicU64>,

  pub(crate) invalidations: CachePadded<AtomicU64>,

  created_at: Instant,
}

// Manual implementation of Default to handle the non-default `Instant`.
impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      coalesced: CachePadded::new(AtomicU64::new(0)),
      batches: CachePadded::new(AtomicU64::new(0)),
      executor_calls: CachePadded::new(AtomicU64::new(0)),
      executor_failures: CachePadded::new(AtomicU64::new(0)),
      keys_found: CachePadded::new(AtomicU64::new(0)),
      keys_not_found: CachePadded::new(AtomicU64::new(0)),
      invalidations: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      coalesced: self.coalesced.load(Ordering::Relaxed),
      batches: self.batches.load(Ordering::Relaxed),
      executor_calls: self.executor_calls.load(Ordering::Relaxed),
      executor_failures: self.executor_failures.load(Ordering::Relaxed),
      keys_found: self.keys_found.load(Ordering::Relaxed),
      keys_not_found: self.keys_not_found.load(Ordering::Relaxed),
      invalidations: self.invalidations.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Lookups answered straight from the resolved store.
  pub hits: u64,
  /// Lookups that led a new pending entry and queued network work.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// Lookups that joined an already-pending entry for the same key.
  pub coalesced: u64,
  /// Batches drafted and dispatched by the coordinator.
  pub batches: u64,
  /// Individual executor attempts, including retries.
  pub executor_calls: u64,
  /// Executor attempts that returned an error.
  pub executor_failures: u64,
  /// Keys settled with a resolved value.
  pub keys_found: u64,
  /// Keys settled absent (missing upstream, or retries exhausted).
  pub keys_not_found: u64,
  /// Entries removed via `invalidate`.
  pub invalidations: u64,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("coalesced", &self.coalesced)
      .field("batches", &self.batches)
      .field("executor_calls", &self.executor_calls)
      .field("executor_failures", &self.executor_failures)
      .field("keys_found", &self.keys_found)
      .field("keys_not_found", &self.keys_not_found)
      .field("invalidations", &self.invalidations)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
