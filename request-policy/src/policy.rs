//! Policy and factory abstractions.
//!
//! A [`PolicyFactory`] is an immutable blueprint shared by every send. For each
//! send the [`Pipeline`](crate::Pipeline) asks every factory for a fresh
//! [`Policy`], handing it the [`Next`] link to forward to. The resulting chain
//! lives for exactly one send, so policies are free to keep mutable state
//! (attempt counters, start times) without synchronisation.
//!
//! # Writing a policy
//!
//! ```ignore
//! use request_policy::{BoxFuture, Context, Next, Policy, PolicyFactory, PipelineError, Request, Response};
//!
//! struct CountAttempts { next: Next, attempts: u32 }
//!
//! impl Policy for CountAttempts {
//!     fn send<'a>(
//!         &'a mut self,
//!         ctx: &'a Context,
//!         request: &'a mut Request,
//!     ) -> BoxFuture<'a, Result<Response, PipelineError>> {
//!         Box::pin(async move {
//!             self.attempts += 1;
//!             self.next.send(ctx, request).await
//!         })
//!     }
//! }
//!
//! struct CountAttemptsFactory;
//!
//! impl PolicyFactory for CountAttemptsFactory {
//!     fn create(&self, next: Next) -> Box<dyn Policy> {
//!         Box::new(CountAttempts { next, attempts: 0 })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Context, PipelineError, Request, Response};

/// Type alias for a boxed future returning a result.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One link of a per-send chain.
pub trait Policy: Send {
    /// Handle the request, usually by forwarding it to the next link.
    ///
    /// A policy may call its next link zero times (short-circuit), once, or
    /// several times (retry).
    fn send<'a>(
        &'a mut self,
        ctx: &'a Context,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Response, PipelineError>>;
}

/// The remainder of the chain below a policy.
///
/// The last link always delivers the request to the pipeline's sender.
pub struct Next {
    inner: Box<dyn Policy>,
}

impl Next {
    /// Wrap a policy as the next link.
    pub fn new(policy: Box<dyn Policy>) -> Self {
        Self { inner: policy }
    }

    /// Forward the request to the rest of the chain.
    pub fn send<'a>(
        &'a mut self,
        ctx: &'a Context,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Response, PipelineError>> {
        self.inner.send(ctx, request)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Immutable blueprint that creates one [`Policy`] per send.
///
/// Closures of the form `Fn(Next) -> Box<dyn Policy>` are factories too.
pub trait PolicyFactory: Send + Sync {
    /// Create a policy bound to `next`.
    fn create(&self, next: Next) -> Box<dyn Policy>;
}

impl<F> PolicyFactory for F
where
    F: Fn(Next) -> Box<dyn Policy> + Send + Sync,
{
    fn create(&self, next: Next) -> Box<dyn Policy> {
        self(next)
    }
}

/// An entry in a pipeline's factory list.
#[derive(Clone)]
pub enum Factory {
    /// A configured factory, instantiated on every send.
    Policy(Arc<dyn PolicyFactory>),
    /// Where a call-site method factory is spliced in. Skipped when the send
    /// supplies none.
    MethodMarker,
}

impl Factory {
    /// Wrap a policy factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: PolicyFactory + 'static,
    {
        Factory::Policy(Arc::new(factory))
    }

    /// The method marker.
    pub fn method_marker() -> Self {
        Factory::MethodMarker
    }

    pub fn is_method_marker(&self) -> bool {
        matches!(self, Factory::MethodMarker)
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Factory::Policy(_) => write!(f, "Factory::Policy"),
            Factory::MethodMarker => write!(f, "Factory::MethodMarker"),
        }
    }
}
