use crate::lookup::LookupState;
use crate::outcome::Outcome;

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ahash::HashMap;
use parking_lot::{Condvar, Mutex};

/// How a lookup attached itself to the registry.
pub(crate) enum JoinResult<V> {
  /// The store already held a settled outcome (found by the re-check under
  /// the registry lock).
  Cached(Outcome<V>),
  /// The key was already pending; this caller became one more waiter.
  Joined(Arc<LookupState<V>>),
  /// This caller created the pending entry and queued the key for the next
  /// draft.
  Led(Arc<LookupState<V>>),
}

struct PendingState<K, V> {
  /// Every key that is queued or in flight, with its shared waiter state.
  /// A key is in flight when it is present here but absent from `queued`.
  entries: HashMap<K, Arc<LookupState<V>>>,
  /// Keys awaiting the next batch draft, in arrival order.
  queued: Vec<K>,
}

/// The pending waiter registry.
///
/// One global mutex guards both the entry map and the draft queue; every
/// critical section is a handful of map operations, dwarfed by the network
/// latency the registry exists to hide. The condvar wakes the coordinator
/// when a lookup leads a new entry.
pub(crate) struct PendingRegistry<K, V> {
  inner: Mutex<PendingState<K, V>>,
  wake: Condvar,
}

impl<K, V> PendingRegistry<K, V> {
  pub(crate) fn new() -> Self {
    Self {
      inner: Mutex::new(PendingState {
        entries: HashMap::default(),
        queued: Vec::new(),
      }),
      wake: Condvar::new(),
    }
  }

  /// Atomically drains the keys queued for the next draft. Their entries
  /// remain in the registry (now in flight) until settled.
  pub(crate) fn drain_queued(&self) -> Vec<K> {
    std::mem::take(&mut self.inner.lock().queued)
  }

  /// Blocks until a key is queued or `stop` is set. Re-checks at least every
  /// `idle_interval` so a stop request is never missed for long.
  ///
  /// Returns `true` if work is available, `false` on stop.
  pub(crate) fn wait_for_work(&self, idle_interval: Duration, stop: &AtomicBool) -> bool {
    let mut inner = self.inner.lock();
    loop {
      if stop.load(Ordering::Relaxed) {
        return false;
      }
      if !inner.queued.is_empty() {
        return true;
      }
      self.wake.wait_for(&mut inner, idle_interval);
    }
  }

  /// Wakes the coordinator regardless of queue state (used on shutdown).
  pub(crate) fn wake_all(&self) {
    self.wake.notify_all();
  }

  /// Settles every remaining entry as absent and empties the registry.
  /// Runs when the coordinator exits so no waiter is left parked forever.
  pub(crate) fn fail_all(&self) {
    let mut inner = self.inner.lock();
    inner.queued.clear();
    for (_, state) in inner.entries.drain() {
      state.complete(Outcome::NotFound);
    }
  }
}

impl<K, V> PendingRegistry<K, V>
where
  K: Eq + Hash + Clone,
{
  /// Attaches a lookup for `key`: joins the pending entry if one exists,
  /// otherwise creates and queues one.
  ///
  /// `recheck` reads the resolved store under the registry lock. A settlement
  /// writes the store before removing its registry entry, so a key absent
  /// from both at this point is guaranteed to be genuinely unresolved.
  pub(crate) fn join_or_lead(
    &self,
    key: &K,
    recheck: impl FnOnce() -> Option<Outcome<V>>,
  ) -> JoinResult<V> {
    let mut inner = self.inner.lock();

    if let Some(outcome) = recheck() {
      return JoinResult::Cached(outcome);
    }

    if let Some(existing) = inner.entries.get(key) {
      return JoinResult::Joined(existing.clone());
    }

    let state = Arc::new(LookupState::new());
    inner.entries.insert(key.clone(), state.clone());
    inner.queued.push(key.clone());
    self.wake.notify_one();
    JoinResult::Led(state)
  }

  /// Removes and returns the pending entry for a settled key.
  pub(crate) fn settle_remove(&self, key: &K) -> Option<Arc<LookupState<V>>> {
    self.inner.lock().entries.remove(key)
  }
}
