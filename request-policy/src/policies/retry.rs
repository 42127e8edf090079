//! Transient-failure retry policy.
//!
//! # Retryable outcomes
//!
//! - HTTP 503 (Service Unavailable) responses
//! - Errors for which [`PipelineError::is_transient`] is true: connection
//!   failures and per-attempt timeouts
//!
//! Every other status (including other 4xx/5xx) and every other error is
//! returned at once without consuming an attempt. When attempts run out the
//! last outcome is returned as-is, so callers must inspect the status of an
//! `Ok` response.

use http::StatusCode;

use crate::config::RetryOptions;
use crate::policy::{BoxFuture, Next, Policy, PolicyFactory};
use crate::{Context, PipelineError, Request, Response};

/// Creates a retry policy per send.
///
/// # Example
///
/// ```ignore
/// use request_policy::{Pipeline, RetryFactory, RetryOptions};
/// use std::time::Duration;
///
/// let pipeline = Pipeline::builder()
///     .with_policy(RetryFactory::new(
///         RetryOptions::new()
///             .max_attempts(4)
///             .base_delay(Duration::from_millis(800)),
///     ))
///     .build()?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct RetryFactory {
    options: RetryOptions,
}

impl RetryFactory {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    /// Create a factory, rejecting invalid options.
    pub fn try_new(options: RetryOptions) -> Result<Self, PipelineError> {
        options.validate().map_err(PipelineError::config)?;
        Ok(Self::new(options))
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }
}

impl PolicyFactory for RetryFactory {
    fn create(&self, next: Next) -> Box<dyn Policy> {
        Box::new(RetryPolicy {
            next,
            options: self.options.clone(),
        })
    }
}

struct RetryPolicy {
    next: Next,
    options: RetryOptions,
}

fn is_retryable(outcome: &Result<Response, PipelineError>) -> bool {
    match outcome {
        Ok(response) => response.status() == StatusCode::SERVICE_UNAVAILABLE,
        Err(err) => err.is_transient(),
    }
}

fn describe(outcome: &Result<Response, PipelineError>) -> String {
    match outcome {
        Ok(response) => response.status().to_string(),
        Err(err) => err.to_string(),
    }
}

impl Policy for RetryPolicy {
    fn send<'a>(
        &'a mut self,
        ctx: &'a Context,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Response, PipelineError>> {
        Box::pin(async move {
            // A one-shot body cannot be replayed.
            let max_attempts = if request.body_ref().is_rewindable() {
                self.options.max_attempts.max(1)
            } else {
                1
            };

            let mut attempt: u32 = 0;
            loop {
                ctx.check()?;
                let outcome = self.next.send(ctx, request).await;

                if !is_retryable(&outcome) {
                    return outcome;
                }

                let delay = self.options.jittered_delay_for(attempt);
                attempt += 1;
                if attempt >= max_attempts {
                    tracing::debug!(
                        attempts = attempt,
                        outcome = %describe(&outcome),
                        "retry attempts exhausted"
                    );
                    return outcome;
                }

                tracing::debug!(
                    attempt,
                    ?delay,
                    outcome = %describe(&outcome),
                    "retrying after transient failure"
                );

                // Release the discarded response before the next attempt.
                drop(outcome);
                ctx.sleep(delay).await?;
            }
        })
    }
}
