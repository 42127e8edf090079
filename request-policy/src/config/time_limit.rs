//! Time budget configuration.

use std::time::Duration;

/// Configuration for the client time-limit policy.
///
/// `overall` bounds the cumulative wall-clock time of every attempt of one
/// operation, measured from the first attempt. `try_timeout`, when set, bounds
/// each attempt on its own; an attempt that runs past it fails with
/// [`PipelineError::AttemptTimedOut`](crate::PipelineError::AttemptTimedOut),
/// which an enclosing retry policy treats as transient.
///
/// # Example
///
/// ```
/// use request_policy::TimeLimitOptions;
/// use std::time::Duration;
///
/// let options = TimeLimitOptions::new(Duration::from_secs(30))
///     .try_timeout(Duration::from_secs(5));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct TimeLimitOptions {
    /// Budget for the whole operation.
    pub overall: Duration,

    /// Optional bound on a single attempt.
    pub try_timeout: Option<Duration>,
}

impl TimeLimitOptions {
    /// Options with an overall budget and no per-attempt bound.
    pub fn new(overall: Duration) -> Self {
        Self {
            overall,
            try_timeout: None,
        }
    }

    /// Bound each attempt.
    pub fn try_timeout(mut self, timeout: Duration) -> Self {
        self.try_timeout = Some(timeout);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.overall.is_zero() {
            return Err("overall budget must be non-zero");
        }
        match self.try_timeout {
            Some(timeout) if timeout.is_zero() => Err("try_timeout must be non-zero"),
            Some(timeout) if timeout > self.overall => {
                Err("try_timeout must not exceed the overall budget")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(TimeLimitOptions::new(Duration::from_secs(1)).validate().is_ok());
        assert!(TimeLimitOptions::new(Duration::ZERO).validate().is_err());

        let options =
            TimeLimitOptions::new(Duration::from_secs(1)).try_timeout(Duration::from_secs(2));
        assert!(options.validate().is_err());

        let options = TimeLimitOptions::new(Duration::from_secs(1)).try_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }
}
