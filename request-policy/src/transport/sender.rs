//! The terminal sender abstraction.

use std::future::Future;
use std::sync::Arc;

use super::TransportBody;
use crate::policy::BoxFuture;
use crate::{PipelineError, Response};

/// Performs the network exchange for one fully-formed request.
///
/// The pipeline's last link hands every attempt to a `Sender`. The returned
/// future may be dropped mid-flight when the operation's
/// [`Context`](crate::Context) is cancelled, so implementations must not rely
/// on running to completion.
///
/// Swap the default [`HyperTransport`](super::HyperTransport) for a
/// [`SenderFn`] in tests to simulate status codes, latency, or faults.
pub trait Sender: Send + Sync {
    fn send(
        &self,
        request: http::Request<TransportBody>,
    ) -> BoxFuture<'static, Result<Response, PipelineError>>;
}

impl<S> Sender for Arc<S>
where
    S: Sender + ?Sized,
{
    fn send(
        &self,
        request: http::Request<TransportBody>,
    ) -> BoxFuture<'static, Result<Response, PipelineError>> {
        (**self).send(request)
    }
}

/// A [`Sender`] backed by an async closure.
///
/// # Example
///
/// ```ignore
/// use request_policy::{response, sender_fn};
/// use http::StatusCode;
///
/// let always_busy = sender_fn(|_request| async {
///     Ok(response::empty(StatusCode::SERVICE_UNAVAILABLE))
/// });
/// ```
#[derive(Clone)]
pub struct SenderFn<F> {
    f: F,
}

/// Create a [`SenderFn`] from an async closure.
pub fn sender_fn<F, Fut>(f: F) -> SenderFn<F>
where
    F: Fn(http::Request<TransportBody>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, PipelineError>> + Send + 'static,
{
    SenderFn { f }
}

impl<F, Fut> Sender for SenderFn<F>
where
    F: Fn(http::Request<TransportBody>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, PipelineError>> + Send + 'static,
{
    fn send(
        &self,
        request: http::Request<TransportBody>,
    ) -> BoxFuture<'static, Result<Response, PipelineError>> {
        Box::pin((self.f)(request))
    }
}

impl<F> std::fmt::Debug for SenderFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderFn").finish()
    }
}
