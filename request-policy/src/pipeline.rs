//! The pipeline: an immutable factory list plus a sender.
//!
//! Every send assembles a fresh chain of policies from the factory list, in
//! declared order, ending with the terminal link that hands the request to the
//! [`Sender`]. Requests travel down the chain in declared order and responses
//! travel back up in reverse.
//!
//! # Method marker
//!
//! At most one [`Factory::MethodMarker`] entry names the position where a
//! call-site factory is spliced in. Sending with a method factory puts its
//! policy there; sending without one skips the marker.
//!
//! # Example
//!
//! ```ignore
//! use request_policy::{Context, LoggingFactory, Pipeline, Request, RetryFactory, RetryOptions};
//!
//! let pipeline = Pipeline::builder()
//!     .with_policy(RetryFactory::new(RetryOptions::default()))
//!     .with_method_marker()
//!     .with_policy(LoggingFactory::default())
//!     .build()?;
//!
//! let response = pipeline
//!     .send_request(&Context::none(), Request::get("https://example.com/".parse()?))
//!     .await?;
//! ```

use std::sync::Arc;

use crate::policy::{BoxFuture, Factory, Next, Policy, PolicyFactory};
use crate::transport::{HyperTransport, Sender};
use crate::{Context, PipelineError, Request, Response};

/// An immutable, reusable policy pipeline.
///
/// Cloning is cheap and clones share the same factories and sender.
#[derive(Clone)]
pub struct Pipeline {
    factories: Arc<[Factory]>,
    sender: Arc<dyn Sender>,
}

impl Pipeline {
    /// Create a pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Create a pipeline from a factory list and a sender.
    ///
    /// Fails with [`PipelineError::Config`] if the method marker appears more
    /// than once.
    pub fn new<S>(factories: Vec<Factory>, sender: S) -> Result<Self, PipelineError>
    where
        S: Sender + 'static,
    {
        Self::from_parts(factories, Arc::new(sender))
    }

    fn from_parts(factories: Vec<Factory>, sender: Arc<dyn Sender>) -> Result<Self, PipelineError> {
        check_marker_count(&factories)?;
        Ok(Self {
            factories: factories.into(),
            sender,
        })
    }

    /// The configured factories, outermost first.
    pub fn factories(&self) -> &[Factory] {
        &self.factories
    }

    /// Whether the factory list contains the method marker.
    pub fn has_method_marker(&self) -> bool {
        self.factories.iter().any(Factory::is_method_marker)
    }

    /// Send a request through a freshly assembled chain.
    ///
    /// `method_factory`, when given, is instantiated at the method marker.
    /// Supplying one to a pipeline without a marker is a configuration error.
    pub async fn send(
        &self,
        ctx: &Context,
        mut request: Request,
        method_factory: Option<&dyn PolicyFactory>,
    ) -> Result<Response, PipelineError> {
        let mut chain = self.assemble(method_factory)?;
        chain.send(ctx, &mut request).await
    }

    /// Send a request without a method factory.
    pub async fn send_request(
        &self,
        ctx: &Context,
        request: Request,
    ) -> Result<Response, PipelineError> {
        self.send(ctx, request, None).await
    }

    /// Build the per-send chain, innermost link first.
    fn assemble(&self, method_factory: Option<&dyn PolicyFactory>) -> Result<Next, PipelineError> {
        debug_assert!(check_marker_count(&self.factories).is_ok());
        if method_factory.is_some() && !self.has_method_marker() {
            return Err(PipelineError::config(
                "a method policy factory was supplied but the pipeline has no method marker",
            ));
        }

        let mut next = Next::new(Box::new(TransportPolicy {
            sender: self.sender.clone(),
        }));

        for factory in self.factories.iter().rev() {
            next = match factory {
                Factory::Policy(factory) => Next::new(factory.create(next)),
                Factory::MethodMarker => match method_factory {
                    Some(method) => Next::new(method.create(next)),
                    None => next,
                },
            };
        }

        Ok(next)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("factories", &self.factories)
            .finish_non_exhaustive()
    }
}

fn check_marker_count(factories: &[Factory]) -> Result<(), PipelineError> {
    let markers = factories.iter().filter(|f| f.is_method_marker()).count();
    if markers > 1 {
        return Err(PipelineError::config(format!(
            "the method marker may appear at most once, found {markers}"
        )));
    }
    Ok(())
}

/// The last link of every chain.
struct TransportPolicy {
    sender: Arc<dyn Sender>,
}

impl Policy for TransportPolicy {
    fn send<'a>(
        &'a mut self,
        ctx: &'a Context,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Response, PipelineError>> {
        Box::pin(async move {
            ctx.check()?;
            let request = request.to_http()?;
            ctx.run(self.sender.send(request)).await?
        })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    factories: Vec<Factory>,
    sender: Option<Arc<dyn Sender>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy factory. Earlier factories wrap later ones.
    pub fn with_policy<F>(mut self, factory: F) -> Self
    where
        F: PolicyFactory + 'static,
    {
        self.factories.push(Factory::new(factory));
        self
    }

    /// Append a factory entry as-is.
    pub fn with_factory(mut self, factory: Factory) -> Self {
        self.factories.push(factory);
        self
    }

    /// Append the method marker.
    pub fn with_method_marker(mut self) -> Self {
        self.factories.push(Factory::MethodMarker);
        self
    }

    /// Use a custom sender instead of the default [`HyperTransport`].
    pub fn with_sender<S>(mut self, sender: S) -> Self
    where
        S: Sender + 'static,
    {
        self.sender = Some(Arc::new(sender));
        self
    }

    /// Build the pipeline.
    ///
    /// Fails when the method marker was added more than once, or when no
    /// sender was given and the default transport cannot be built.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        check_marker_count(&self.factories)?;
        let sender: Arc<dyn Sender> = match self.sender {
            Some(sender) => sender,
            None => Arc::new(HyperTransport::new()?),
        };
        Pipeline::from_parts(self.factories, sender)
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("factories", &self.factories)
            .field("sender", &self.sender.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::{Method, StatusCode, Uri};
    use http_body_util::BodyExt;

    use super::*;
    use crate::response;
    use crate::transport::{TransportBody, sender_fn};

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        trace: Trace,
        next: Next,
    }

    impl Policy for Recording {
        fn send<'a>(
            &'a mut self,
            ctx: &'a Context,
            request: &'a mut Request,
        ) -> BoxFuture<'a, Result<Response, PipelineError>> {
            Box::pin(async move {
                self.trace.lock().unwrap().push(format!("{}>", self.name));
                let result = self.next.send(ctx, request).await;
                self.trace.lock().unwrap().push(format!("<{}", self.name));
                result
            })
        }
    }

    fn recording(name: &'static str, trace: &Trace) -> impl PolicyFactory + use<> {
        let trace = trace.clone();
        move |next: Next| -> Box<dyn Policy> {
            Box::new(Recording {
                name,
                trace: trace.clone(),
                next,
            })
        }
    }

    fn recording_sender(trace: &Trace) -> impl Sender + use<> {
        let trace = trace.clone();
        sender_fn(move |_request| {
            trace.lock().unwrap().push("Transport".to_string());
            async { Ok(response::empty(StatusCode::OK)) }
        })
    }

    fn request() -> Request {
        Request::get(Uri::from_static("http://localhost/items"))
    }

    fn ordered_pipeline(trace: &Trace) -> Pipeline {
        Pipeline::builder()
            .with_policy(recording("A", trace))
            .with_policy(recording("B", trace))
            .with_method_marker()
            .with_policy(recording("C", trace))
            .with_sender(recording_sender(trace))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_method_policy_spliced_at_marker() {
        let trace = Trace::default();
        let pipeline = ordered_pipeline(&trace);
        let method = recording("M", &trace);

        let response = pipeline
            .send(&Context::none(), request(), Some(&method))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *trace.lock().unwrap(),
            ["A>", "B>", "M>", "C>", "Transport", "<C", "<M", "<B", "<A"]
        );
    }

    #[tokio::test]
    async fn test_marker_skipped_without_method_policy() {
        let trace = Trace::default();
        let pipeline = ordered_pipeline(&trace);

        pipeline
            .send_request(&Context::none(), request())
            .await
            .unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            ["A>", "B>", "C>", "Transport", "<C", "<B", "<A"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_marker_rejected() {
        let trace = Trace::default();

        let err = Pipeline::builder()
            .with_method_marker()
            .with_policy(recording("A", &trace))
            .with_method_marker()
            .with_sender(recording_sender(&trace))
            .build()
            .unwrap_err();
        assert!(err.is_config());

        let err = Pipeline::new(
            vec![Factory::method_marker(), Factory::method_marker()],
            recording_sender(&trace),
        )
        .unwrap_err();
        assert!(err.is_config());
        assert!(trace.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_marker_pipeline_sends_repeatedly() {
        let trace = Trace::default();
        let pipeline = Pipeline::builder()
            .with_policy(recording("A", &trace))
            .with_method_marker()
            .with_sender(recording_sender(&trace))
            .build()
            .unwrap();
        let method = recording("M", &trace);

        for _ in 0..3 {
            pipeline
                .send(&Context::none(), request(), Some(&method))
                .await
                .unwrap();
        }

        let trace = trace.lock().unwrap();
        assert_eq!(trace.iter().filter(|s| *s == "Transport").count(), 3);
        assert_eq!(trace.iter().filter(|s| *s == "M>").count(), 3);
    }

    #[tokio::test]
    async fn test_method_policy_without_marker_rejected() {
        let trace = Trace::default();
        let pipeline = Pipeline::builder()
            .with_policy(recording("A", &trace))
            .with_sender(recording_sender(&trace))
            .build()
            .unwrap();
        let method = recording("M", &trace);

        let err = pipeline
            .send(&Context::none(), request(), Some(&method))
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert!(trace.lock().unwrap().is_empty(), "nothing may be sent");
    }

    #[tokio::test]
    async fn test_fresh_policies_per_send() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let factory = move |next: Next| -> Box<dyn Policy> {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(Recording {
                name: "A",
                trace: Trace::default(),
                next,
            })
        };

        let pipeline = Pipeline::builder()
            .with_policy(factory)
            .with_sender(sender_fn(|_| async { Ok(response::empty(StatusCode::OK)) }))
            .build()
            .unwrap();

        for _ in 0..3 {
            pipeline
                .send_request(&Context::none(), request())
                .await
                .unwrap();
        }
        assert_eq!(created.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_resend_rewinds_body() {
        struct SendTwice {
            next: Next,
        }

        impl Policy for SendTwice {
            fn send<'a>(
                &'a mut self,
                ctx: &'a Context,
                request: &'a mut Request,
            ) -> BoxFuture<'a, Result<Response, PipelineError>> {
                Box::pin(async move {
                    drop(self.next.send(ctx, request).await?);
                    self.next.send(ctx, request).await
                })
            }
        }

        let bodies = Arc::new(Mutex::new(Vec::new()));
        let seen = bodies.clone();
        let pipeline = Pipeline::builder()
            .with_policy(|next: Next| Box::new(SendTwice { next }) as Box<dyn Policy>)
            .with_sender(sender_fn(move |request: http::Request<TransportBody>| {
                let seen = seen.clone();
                async move {
                    let body = request.into_body().collect().await.unwrap().to_bytes();
                    seen.lock().unwrap().push(body);
                    Ok(response::empty(StatusCode::OK))
                }
            }))
            .build()
            .unwrap();

        let request = Request::new(Method::PUT, Uri::from_static("http://localhost/items/1"))
            .body("{\"name\":\"a\"}");
        pipeline
            .send_request(&Context::none(), request)
            .await
            .unwrap();

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], Bytes::from("{\"name\":\"a\"}"));
        assert_eq!(bodies[0], bodies[1]);
    }

    #[tokio::test]
    async fn test_cancelled_context_never_reaches_sender() {
        let trace = Trace::default();
        let pipeline = ordered_pipeline(&trace);
        let (ctx, cancel) = Context::none().with_cancel();
        cancel.cancel();

        let err = pipeline.send_request(&ctx, request()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Canceled));
        assert!(!trace.lock().unwrap().contains(&"Transport".to_string()));
    }

    #[tokio::test]
    async fn test_policy_error_propagates_unchanged() {
        let pipeline = Pipeline::builder()
            .with_policy(|_next: Next| -> Box<dyn Policy> {
                struct Deny;
                impl Policy for Deny {
                    fn send<'a>(
                        &'a mut self,
                        _ctx: &'a Context,
                        _request: &'a mut Request,
                    ) -> BoxFuture<'a, Result<Response, PipelineError>> {
                        Box::pin(async { Err(PipelineError::policy("denied")) })
                    }
                }
                Box::new(Deny)
            })
            .with_sender(sender_fn(|_| async { Ok(response::empty(StatusCode::OK)) }))
            .build()
            .unwrap();

        let err = pipeline
            .send_request(&Context::none(), request())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Policy(ref m) if m == "denied"));
    }
}
