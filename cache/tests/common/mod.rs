use quarry_cache::{CacheBuilder, FetchError, FixedBackoff};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A remotely-resolved record, keyed by its numeric id.
#[derive(Debug, PartialEq, Eq)]
pub struct Record {
  pub id: u64,
  pub name: String,
}

pub fn record(id: u64) -> Record {
  Record {
    id,
    name: format!("record-{id}"),
  }
}

/// A builder whose executor resolves every requested key and counts its
/// invocations. Short fixed backoff and a wide batch window keep the tests
/// fast and deterministic.
pub fn resolving_builder(calls: Arc<AtomicUsize>) -> CacheBuilder<u64, Record> {
  CacheBuilder::default()
    .batch_window(Duration::from_millis(50))
    .backoff(FixedBackoff(Duration::from_millis(2)))
    .executor(move |keys: &[u64]| {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(keys.iter().map(|&id| record(id)).collect())
    })
    .key_of(|record: &Record| record.id)
}

/// Like `resolving_builder`, but the executor only returns records for keys
/// accepted by `filter` — the rest are absent upstream.
pub fn filtering_builder(
  calls: Arc<AtomicUsize>,
  filter: fn(u64) -> bool,
) -> CacheBuilder<u64, Record> {
  CacheBuilder::default()
    .batch_window(Duration::from_millis(100))
    .backoff(FixedBackoff(Duration::from_millis(2)))
    .executor(move |keys: &[u64]| {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok(keys.iter().copied().filter(|&id| filter(id)).map(record).collect())
    })
    .key_of(|record: &Record| record.id)
}

/// A builder whose executor fails the first `failures` attempts with an
/// error, then resolves every requested key.
pub fn flaky_builder(calls: Arc<AtomicUsize>, failures: usize) -> CacheBuilder<u64, Record> {
  CacheBuilder::default()
    .batch_window(Duration::from_millis(20))
    .backoff(FixedBackoff(Duration::from_millis(2)))
    .executor(move |keys: &[u64]| {
      let attempt = calls.fetch_add(1, Ordering::SeqCst);
      if attempt < failures {
        return Err::<Vec<Record>, FetchError>("remote endpoint unavailable".into());
      }
      Ok(keys.iter().map(|&id| record(id)).collect())
    })
    .key_of(|record: &Record| record.id)
}
