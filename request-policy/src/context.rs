//! Cancellation context threaded through every policy call.
//!
//! A [`Context`] is created once per logical operation (one user-level call,
//! which may retry internally) and passed by reference down the chain. It is
//! never mutated: deriving a narrower scope with [`Context::with_timeout`] or
//! [`Context::with_cancel`] returns a new value.
//!
//! Every suspension point in the pipeline (the transport call and the retry
//! backoff sleep) races against [`Context::done`], so cancellation is observed
//! promptly and surfaces as [`PipelineError::Canceled`] or
//! [`PipelineError::DeadlineExceeded`].
//!
//! # Example
//!
//! ```ignore
//! use request_policy::Context;
//! use std::time::Duration;
//!
//! let (ctx, cancel) = Context::none().with_cancel();
//! let ctx = ctx.with_timeout(Duration::from_secs(30));
//!
//! // Elsewhere: abandon the operation.
//! cancel.cancel();
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::PipelineError;

/// Immutable cancellation scope for one logical operation.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a context observing the given cancellation token.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a context that observes a different token, keeping the deadline.
    pub fn with_cancellation_token(&self, token: CancellationToken) -> Self {
        Self {
            token,
            deadline: self.deadline,
        }
    }

    /// Derive a child scope that can be cancelled independently.
    ///
    /// Cancelling the returned token cancels only the returned context (and its
    /// descendants); cancelling `self` cancels both.
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let child = self.token.child_token();
        let ctx = Self {
            token: child.clone(),
            deadline: self.deadline,
        };
        (ctx, child)
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    ///
    /// An earlier deadline inherited from `self` is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(candidate) => Some(match self.deadline {
                Some(existing) => existing.min(candidate),
                None => candidate,
            }),
            None => self.deadline,
        };
        Self {
            token: self.token.clone(),
            deadline,
        }
    }

    /// The cancellation token observed by this context.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns true once the token is cancelled or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Return the cancellation error if this context is already done.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.token.is_cancelled() {
            return Err(PipelineError::Canceled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(PipelineError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolve when the context is cancelled or its deadline passes.
    ///
    /// Explicit cancellation wins when both happen at once.
    pub async fn done(&self) -> PipelineError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => PipelineError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => PipelineError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                PipelineError::Canceled
            }
        }
    }

    /// Drive `fut` to completion unless the context finishes first.
    ///
    /// When the context is done the future is dropped, which aborts whatever
    /// I/O it was performing.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, PipelineError>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }

    /// Sleep for `duration`, waking early with an error on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), PipelineError> {
        self.run(tokio::time::sleep(duration)).await
    }
}

impl From<CancellationToken> for Context {
    fn from(token: CancellationToken) -> Self {
        Self::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_never_cancelled() {
        let ctx = Context::none();
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_none());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_derived_scopes_do_not_mutate_parent() {
        let parent = Context::none();
        let (child, cancel) = parent.with_cancel();

        cancel.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_parent_cancellation_reaches_child() {
        let token = CancellationToken::new();
        let parent = Context::from(token.clone());
        let (child, _cancel) = parent.with_cancel();

        token.cancel();

        assert!(matches!(child.check(), Err(PipelineError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_keeps_earlier_deadline() {
        let outer = Context::none().with_timeout(Duration::from_millis(50));
        let inner = outer.with_timeout(Duration::from_secs(10));

        assert_eq!(inner.deadline(), outer.deadline());
        assert!(outer.remaining().unwrap() <= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_observes_deadline() {
        let ctx = Context::none().with_timeout(Duration::from_millis(20));
        let start = Instant::now();

        let result = ctx.sleep(Duration::from_secs(5)).await;

        assert!(matches!(result, Err(PipelineError::DeadlineExceeded)));
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_observes_cancellation() {
        let (ctx, cancel) = Context::none().with_cancel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let start = Instant::now();
        let result = ctx.sleep(Duration::from_secs(60)).await;

        assert!(matches!(result, Err(PipelineError::Canceled)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_refuses_to_start_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = Context::new(token);

        let result = ctx.run(async { 7 }).await;
        assert!(matches!(result, Err(PipelineError::Canceled)));
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        let ctx = Context::none();
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }
}
