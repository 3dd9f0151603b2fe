//! A concurrent, coalescing, batching lookup cache for remotely-resolved
//! objects.
//!
//! Many callers ask for individually-keyed objects; the cache merges
//! concurrent requests for the same key into one pending entry, drafts newly
//! requested keys into batched executor calls on a background coordinator,
//! retries failed batches with exponential backoff, and serves repeat lookups
//! straight from memory.
//!
//! # Features
//! - **Coalescing**: N concurrent lookups for a key cost one executor call.
//! - **Batching**: keys requested within the same drafting window share one
//!   remote call.
//! - **Retry with backoff**: transient executor failures are retried with a
//!   configurable [`BackoffPolicy`]; callers only ever observe an eventual
//!   value or `None`, never an error.
//! - **Sync & Async**: blocking [`Cache`] and future-based [`AsyncCache`]
//!   views over the same core; waiting is runtime-agnostic.
//! - **Non-Clone Support**: values are stored in an `Arc<V>`, avoiding
//!   `V: Clone` bounds.
//! - **Observability**: per-cache [`MetricsSnapshot`] including executor call
//!   and failure counts.

// Public modules that form the API
pub mod backoff;
pub mod builder;
pub mod error;
pub mod handles;
pub mod metrics;
pub mod outcome;
pub mod runtime;

// Internal, crate-only modules
mod executor;
mod lookup;
mod pending;
mod shared;
mod store;
mod task;

// Re-export the primary user-facing types for convenience
pub use backoff::{BackoffPolicy, ExponentialBackoff, FixedBackoff};
pub use builder::CacheBuilder;
pub use error::{BuildError, FetchError};
pub use handles::{AsyncCache, Cache, Lookup};
pub use metrics::MetricsSnapshot;
pub use outcome::Outcome;
pub use runtime::TaskSpawner;
#[cfg(feature = "tokio")]
pub use runtime::TokioSpawner;
