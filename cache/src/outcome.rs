use std::fmt;
use std::sync::Arc;

/// The settled result of a single key's lookup.
///
/// Values are stored and handed out as `Arc<V>`, so callers share one
/// immutable snapshot and `V` needs no `Clone` bound. `NotFound` covers both
/// "the upstream has no object for this key" and "every fetch attempt
/// failed"; callers that need to tell these apart must encode the distinction
/// in `V` itself.
pub enum Outcome<V> {
  /// The executor returned a value whose extracted key matched.
  Found(Arc<V>),
  /// No matching value was returned, or the batch exhausted its retries.
  NotFound,
}

impl<V> Outcome<V> {
  /// Returns the resolved value, or `None` for `NotFound`.
  pub fn value(&self) -> Option<Arc<V>> {
    match self {
      Outcome::Found(value) => Some(value.clone()),
      Outcome::NotFound => None,
    }
  }

  /// Returns `true` if this outcome carries a value.
  pub fn is_found(&self) -> bool {
    matches!(self, Outcome::Found(_))
  }
}

// Manual impls so `V` itself does not need Clone/Debug.
impl<V> Clone for Outcome<V> {
  fn clone(&self) -> Self {
    match self {
      Outcome::Found(value) => Outcome::Found(value.clone()),
      Outcome::NotFound => Outcome::NotFound,
    }
  }
}

impl<V> fmt::Debug for Outcome<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Outcome::Found(_) => f.write_str("Found(..)"),
      Outcome::NotFound => f.write_str("NotFound"),
    }
  }
}
