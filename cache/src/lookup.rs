use crate::outcome::Outcome;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::task::Waker;
use std::thread::{self, Thread};

/// One caller's pending interest in a key's resolution.
pub(crate) enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

pub(crate) enum State<V> {
  Pending,
  Settled(Outcome<V>),
}

pub(crate) struct Inner<V> {
  pub(crate) state: State<V>,
  pub(crate) waiters: VecDeque<Waiter>,
}

/// The shared state of one key that is queued or in flight.
///
/// All callers interested in the key wait on the same `LookupState`; the
/// coordinator settles it exactly once, waking waiters in registration order.
/// It can be awaited by blocking threads and async tasks simultaneously.
pub(crate) struct LookupState<V> {
  pub(crate) inner: Mutex<Inner<V>>,
}

impl<V> LookupState<V> {
  pub(crate) fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        state: State::Pending,
        waiters: VecDeque::new(),
      }),
    }
  }

  /// Settles the lookup, waking all waiters FIFO. A second settlement is a
  /// no-op; the first outcome wins.
  pub(crate) fn complete(&self, outcome: Outcome<V>) {
    let mut inner = self.inner.lock();
    if matches!(inner.state, State::Settled(_)) {
      return;
    }
    inner.state = State::Settled(outcome);
    for waiter in inner.waiters.drain(..) {
      waiter.wake();
    }
  }

  /// Returns the outcome if the lookup has settled.
  pub(crate) fn settled(&self) -> Option<Outcome<V>> {
    match &self.inner.lock().state {
      State::Settled(outcome) => Some(outcome.clone()),
      State::Pending => None,
    }
  }

  /// Blocks the calling thread until the lookup settles.
  pub(crate) fn wait_blocking(&self) -> Outcome<V> {
    let mut inner = self.inner.lock();
    loop {
      match &inner.state {
        State::Settled(outcome) => return outcome.clone(),
        State::Pending => {
          inner.waiters.push_back(Waiter::Sync(thread::current()));
          drop(inner); // Unlock before parking.
          thread::park();
          inner = self.inner.lock();
        }
      }
    }
  }
}

/// Creates a lookup state that is already settled, for cache hits.
pub(crate) fn settled<V>(outcome: Outcome<V>) -> Arc<LookupState<V>> {
  Arc::new(LookupState {
    inner: Mutex::new(Inner {
      state: State::Settled(outcome),
      waiters: VecDeque::new(),
    }),
  })
}
