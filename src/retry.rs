//! Retry policy for completion requests

use std::time::Duration;
use log::debug;

/// Retry policy for failed requests
///
/// The default makes 3 attempts back to back and retries every
/// failure. Backoff and early stop on permanent errors are opt-in.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub backoff_multiplier: f32
  , pub initial_backoff: Duration
  , pub stop_on_permanent: bool
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_attempts: usize
    , backoff_multiplier: f32
    , initial_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , backoff_multiplier
          , initial_backoff: Duration::from_millis(
              initial_backoff_ms
            )
          , stop_on_permanent: false
        }
    }

    /// Fixed attempt count, no delay
    pub fn fixed(max_attempts: usize) -> Self
    {   RetryPolicy::new(max_attempts, 1.0, 0)
    }

    pub fn with_stop_on_permanent(mut self, stop: bool) -> Self
    {   self.stop_on_permanent = stop;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   if self.initial_backoff.is_zero()
        {   return Duration::ZERO;
        }
        debug!("Calculating backoff for attempt {}", attempt);
        let exponent = attempt.saturating_sub(1) as i32;
        let multiplier
          = self.backoff_multiplier.powi(exponent);
        Duration::from_millis(
          (self.initial_backoff.as_millis() as f32
            * multiplier) as u64
        )
    }

    /// Whether a failure on `attempt` should be followed by another try
    pub fn should_retry(
      &self
    , attempt: usize
    , cause: &crate::error::Error
    ) -> bool
    {   if attempt >= self.max_attempts
        {   return false;
        }
        if self.stop_on_permanent && !cause.is_retryable()
        {   debug!("Not retrying permanent error: {}", cause);
            return false;
        }
        true
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::fixed(3)
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy
{   fn from(config: &crate::config::RetryConfig) -> Self
    {   RetryPolicy::new(
          config.max_attempts
        , config.backoff_multiplier
        , config.initial_backoff_ms
        )
        .with_stop_on_permanent(config.stop_on_permanent)
    }
}
