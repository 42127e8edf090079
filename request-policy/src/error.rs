//! Pipeline error types.
//!
//! This module provides [`PipelineError`], the error type returned by every
//! stage of a send: chain assembly, policies, and the transport.

use std::time::Duration;

/// Errors produced while assembling or executing a policy chain.
///
/// Callers branch on the variant (or on [`is_transient`](Self::is_transient)
/// and [`is_cancellation`](Self::is_cancellation)) to learn which stage failed.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PipelineError {
    /// The pipeline's factory list is invalid for this send.
    ///
    /// Raised when the method marker appears more than once, or when a
    /// method factory is supplied to a pipeline without a marker. Never retried.
    #[error("pipeline configuration error: {0}")]
    Config(String),

    /// Network-level failure reported by the sender.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        /// Whether the failure happened before the request reached the peer.
        transient: bool,
    },

    /// The request body could not be prepared for this attempt.
    #[error("request body error: {0}")]
    Body(String),

    /// The operation's context was cancelled.
    #[error("operation canceled")]
    Canceled,

    /// The operation's context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The client time-limit policy's overall budget is spent.
    #[error("overall operation time expired: {elapsed:?} elapsed, limit {limit:?}")]
    TimeLimitExceeded { elapsed: Duration, limit: Duration },

    /// A single attempt ran past its per-attempt timeout.
    #[error("attempt timed out after {0:?}")]
    AttemptTimedOut(Duration),

    /// A custom policy short-circuited the send.
    #[error("policy error: {0}")]
    Policy(String),
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        PipelineError::Config(message.into())
    }

    /// Create a non-transient transport error.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        PipelineError::Transport {
            message: message.into(),
            transient: false,
        }
    }

    /// Create a transport error that is safe to retry.
    pub fn transient_transport<S: Into<String>>(message: S) -> Self {
        PipelineError::Transport {
            message: message.into(),
            transient: true,
        }
    }

    /// Create a request body error.
    pub fn body<S: Into<String>>(message: S) -> Self {
        PipelineError::Body(message.into())
    }

    /// Create a policy error.
    pub fn policy<S: Into<String>>(message: S) -> Self {
        PipelineError::Policy(message.into())
    }

    /// Returns whether the failure is transient and the request may be resent.
    ///
    /// Only connection-establishment failures and per-attempt timeouts are
    /// transient. Cancellation, budget expiry and configuration errors are not.
    ///
    /// # Example
    ///
    /// ```
    /// use request_policy::PipelineError;
    ///
    /// assert!(PipelineError::transient_transport("connection refused").is_transient());
    /// assert!(!PipelineError::transport("invalid response").is_transient());
    /// assert!(!PipelineError::Canceled.is_transient());
    /// ```
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Transport { transient, .. } => *transient,
            PipelineError::AttemptTimedOut(_) => true,
            _ => false,
        }
    }

    /// Returns whether the error came from the context (cancel or deadline).
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            PipelineError::Canceled | PipelineError::DeadlineExceeded
        )
    }

    /// Returns whether this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, PipelineError::Config(_))
    }
}
