//! Client time-limit policy.
//!
//! The budget starts when the policy first runs, not when the pipeline is
//! built. Placed below a retry policy it runs once per attempt and refuses to
//! forward any attempt issued after the budget is spent, bounding the total
//! cost of all attempts.

use tokio::time::Instant;

use crate::config::TimeLimitOptions;
use crate::policy::{BoxFuture, Next, Policy, PolicyFactory};
use crate::{Context, PipelineError, Request, Response};

/// Creates a time-limit policy per send.
///
/// # Example
///
/// ```ignore
/// use request_policy::{Pipeline, RetryFactory, RetryOptions, TimeLimitFactory, TimeLimitOptions};
/// use std::time::Duration;
///
/// let pipeline = Pipeline::builder()
///     .with_policy(RetryFactory::new(RetryOptions::default()))
///     .with_policy(TimeLimitFactory::new(
///         TimeLimitOptions::new(Duration::from_secs(30)).try_timeout(Duration::from_secs(5)),
///     ))
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct TimeLimitFactory {
    options: TimeLimitOptions,
}

impl TimeLimitFactory {
    pub fn new(options: TimeLimitOptions) -> Self {
        Self { options }
    }

    /// Create a factory, rejecting invalid options.
    pub fn try_new(options: TimeLimitOptions) -> Result<Self, PipelineError> {
        options.validate().map_err(PipelineError::config)?;
        Ok(Self::new(options))
    }

    pub fn options(&self) -> &TimeLimitOptions {
        &self.options
    }
}

impl PolicyFactory for TimeLimitFactory {
    fn create(&self, next: Next) -> Box<dyn Policy> {
        Box::new(TimeLimitPolicy {
            next,
            options: self.options.clone(),
            started: None,
        })
    }
}

struct TimeLimitPolicy {
    next: Next,
    options: TimeLimitOptions,
    started: Option<Instant>,
}

impl Policy for TimeLimitPolicy {
    fn send<'a>(
        &'a mut self,
        ctx: &'a Context,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Response, PipelineError>> {
        Box::pin(async move {
            let started = *self.started.get_or_insert_with(Instant::now);
            let elapsed = started.elapsed();
            let limit = self.options.overall;
            if elapsed > limit {
                tracing::warn!(?elapsed, ?limit, "overall operation time expired");
                return Err(PipelineError::TimeLimitExceeded { elapsed, limit });
            }

            let Some(timeout) = self.options.try_timeout else {
                return self.next.send(ctx, request).await;
            };

            let attempt_ctx = ctx.with_timeout(timeout);
            match tokio::time::timeout(timeout, self.next.send(&attempt_ctx, request)).await {
                // The attempt scope expired but the caller's did not.
                Ok(Err(PipelineError::DeadlineExceeded)) if ctx.check().is_ok() => {
                    tracing::debug!(?timeout, "attempt timed out");
                    Err(PipelineError::AttemptTimedOut(timeout))
                }
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::debug!(?timeout, "attempt timed out");
                    Err(PipelineError::AttemptTimedOut(timeout))
                }
            }
        })
    }
}
