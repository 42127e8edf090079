//! Retry configuration with capped exponential backoff.
//!
//! The delay before retrying after attempt `n` (zero-based) is
//!
//! ```text
//! min(max_delay, base_delay * (2^n - 1) / 2)
//! ```
//!
//! so the first retry is immediate and later ones grow geometrically. The
//! arithmetic saturates instead of overflowing, so large attempt counts settle
//! at `max_delay`.
//!
//! # Example
//!
//! ```
//! use request_policy::RetryOptions;
//! use std::time::Duration;
//!
//! let options = RetryOptions::new()
//!     .max_attempts(4)
//!     .base_delay(Duration::from_millis(200))
//!     .max_delay(Duration::from_secs(10));
//!
//! assert_eq!(options.delay_for(0), Duration::ZERO);
//! assert_eq!(options.delay_for(1), Duration::from_millis(100));
//! assert_eq!(options.delay_for(2), Duration::from_millis(300));
//! ```

use std::time::Duration;

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Default backoff base.
    pub const BASE_DELAY: Duration = Duration::from_secs(1);

    /// Default cap on a single backoff delay.
    pub const MAX_DELAY: Duration = Duration::from_secs(120);

    /// Default number of attempts, including the first.
    pub const MAX_ATTEMPTS: u32 = 4;

    /// Default jitter factor. Zero keeps delays deterministic.
    pub const JITTER: f64 = 0.0;
}

/// Configuration for the transient-failure retry policy.
///
/// # Default Values
///
/// - `base_delay`: 1 second
/// - `max_delay`: 120 seconds
/// - `max_attempts`: 4
/// - `jitter`: 0.0
#[derive(Clone, Debug)]
pub struct RetryOptions {
    /// Backoff base.
    pub base_delay: Duration,

    /// Upper bound on any single delay, applied after jitter too.
    pub max_delay: Duration,

    /// Total attempts including the first. At least 1.
    pub max_attempts: u32,

    /// Jitter factor between 0.0 and 1.0. A value of 0.2 spreads each delay
    /// within +/- 20% of the computed value.
    pub jitter: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            base_delay: defaults::BASE_DELAY,
            max_delay: defaults::MAX_DELAY,
            max_attempts: defaults::MAX_ATTEMPTS,
            jitter: defaults::JITTER,
        }
    }
}

impl RetryOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, never retried.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Short delays for latency-sensitive calls.
    /// - Base delay: 50ms
    /// - Max delay: 1 second
    /// - Max attempts: 6
    pub fn aggressive() -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            max_attempts: 6,
            ..Default::default()
        }
    }

    /// Long delays for background work.
    /// - Base delay: 2 seconds
    /// - Max delay: 5 minutes
    /// - Max attempts: 11
    pub fn patient() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(300),
            max_attempts: 11,
            ..Default::default()
        }
    }

    /// Set the total number of attempts.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is 0.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be >= 1");
        self.max_attempts = max_attempts;
        self
    }

    /// Set the backoff base.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the cap on a single delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter factor.
    ///
    /// # Panics
    ///
    /// Panics if `jitter` is not between 0.0 and 1.0.
    pub fn jitter(mut self, jitter: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&jitter),
            "jitter must be between 0.0 and 1.0"
        );
        self.jitter = jitter;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be >= 1");
        }
        if self.base_delay > self.max_delay {
            return Err("base_delay must not exceed max_delay");
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err("jitter must be between 0.0 and 1.0");
        }
        Ok(())
    }

    /// The un-jittered delay after zero-based attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = match 1u128.checked_shl(attempt) {
            Some(power) => power - 1,
            None => u128::MAX,
        };
        let nanos = self.base_delay.as_nanos().saturating_mul(factor) / 2;
        if nanos >= self.max_delay.as_nanos() {
            return self.max_delay;
        }
        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .unwrap_or(self.max_delay)
    }

    /// The delay after `attempt` with jitter applied, still capped at
    /// `max_delay`.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }

        let spread = rand::random::<f64>() * self.jitter * 2.0 - self.jitter;
        let secs = (delay.as_secs_f64() * (1.0 + spread)).max(0.0);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
