use std::time::Duration;

/// Maps a zero-based attempt index to the delay slept before the next retry.
///
/// Implementations must be deterministic and monotonically non-decreasing in
/// the attempt index. The policy is consulted only after a failed attempt;
/// attempt 0 is always dispatched immediately.
pub trait BackoffPolicy: Send + Sync {
  /// The delay to wait after failed attempt `attempt` before dispatching
  /// attempt `attempt + 1`.
  fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff: `base * 2^attempt`, clamped to `cap`.
///
/// The default starts at 100 milliseconds and doubles per attempt, capped at
/// ten seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
  base: Duration,
  cap: Duration,
}

impl ExponentialBackoff {
  /// Creates a policy starting at `base` with the default ten-second cap.
  pub fn new(base: Duration) -> Self {
    Self {
      base,
      cap: Duration::from_secs(10),
    }
  }

  /// Sets the upper bound for any single delay.
  pub fn with_cap(mut self, cap: Duration) -> Self {
    self.cap = cap;
    self
  }
}

impl Default for ExponentialBackoff {
  fn default() -> Self {
    Self::new(Duration::from_millis(100))
  }
}

impl BackoffPolicy for ExponentialBackoff {
  fn delay(&self, attempt: u32) -> Duration {
    // Saturate rather than overflow for absurd attempt counts.
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    self.base.saturating_mul(factor).min(self.cap)
  }
}

/// A constant delay between attempts. Mainly useful where tests need short,
/// deterministic timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff(pub Duration);

impl BackoffPolicy for FixedBackoff {
  fn delay(&self, _attempt: u32) -> Duration {
    self.0
  }
}
