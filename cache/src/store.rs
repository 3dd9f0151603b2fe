use crate::outcome::Outcome;

use core::fmt;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

/// A helper function to hash a key using a `BuildHasher`.
#[inline]
pub(crate) fn hash_key<K: Hash, H: BuildHasher>(hasher: &H, key: &K) -> u64 {
  let mut state = hasher.build_hasher();
  key.hash(&mut state);
  state.finish()
}

/// The resolved store, partitioned into multiple, independently locked
/// shards.
///
/// Reads vastly outnumber writes here (every repeat lookup is a shard read;
/// writes happen only at batch settlement and invalidation), so operations on
/// different keys are unlikely to contend for the same lock.
pub(crate) struct ShardedStore<K, V, H> {
  shards: Box<[CachePadded<RwLock<HashMap<K, Outcome<V>, H>>>]>,
  hasher: H,
}

impl<K, V, H> fmt::Debug for ShardedStore<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedStore")
      .field("num_shards", &self.shards.len())
      .finish()
  }
}

impl<K, V, H> ShardedStore<K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher + Clone,
{
  pub(crate) fn new(num_shards: usize, hasher: H) -> Self {
    let mut shards = Vec::with_capacity(num_shards);
    for _ in 0..num_shards {
      shards.push(CachePadded::new(RwLock::new(HashMap::with_hasher(
        hasher.clone(),
      ))));
    }

    Self {
      shards: shards.into_boxed_slice(),
      hasher,
    }
  }

  #[inline]
  fn shard(&self, key: &K) -> &RwLock<HashMap<K, Outcome<V>, H>> {
    let hash = hash_key(&self.hasher, key);
    // Safe: the builder validates num_shards > 0.
    let index = hash as usize % self.shards.len();
    &self.shards[index]
  }

  /// Returns the settled outcome for `key`, if one has been recorded.
  pub(crate) fn get(&self, key: &K) -> Option<Outcome<V>> {
    self.shard(key).read().get(key).cloned()
  }

  pub(crate) fn insert(&self, key: K, outcome: Outcome<V>) {
    self.shard(&key).write().insert(key, outcome);
  }

  pub(crate) fn remove(&self, key: &K) -> Option<Outcome<V>> {
    self.shard(key).write().remove(key)
  }

  /// Total number of settled entries across all shards.
  pub(crate) fn len(&self) -> usize {
    self.shards.iter().map(|shard| shard.read().len()).sum()
  }
}
