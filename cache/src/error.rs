use thiserror::Error;

/// The error type surfaced by a failed executor attempt.
///
/// The cache never inspects it beyond logging; any attempt error is treated
/// as transient and retried until the attempt budget runs out.
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// The cache was configured with zero store shards.
  #[error("shard count cannot be zero")]
  ZeroShards,
  /// `max_attempts` was set to zero; at least the initial attempt must run.
  #[error("max_attempts must be at least one")]
  ZeroAttempts,
  /// No executor was configured. The cache cannot resolve anything without
  /// one.
  #[error("an executor must be configured before building")]
  MissingExecutor,
  /// No key extractor was configured, so returned values could not be matched
  /// back to requested keys.
  #[error("a key extractor must be configured before building")]
  MissingKeyExtractor,
  /// An async executor was provided, but no `TaskSpawner` was configured and
  /// the default `tokio` feature is not enabled.
  #[error("an async executor requires a task spawner or the 'tokio' feature")]
  SpawnerRequired,
}
