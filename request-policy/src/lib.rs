//! Composable outbound HTTP request pipeline.
//!
//! A [`Pipeline`] holds an ordered list of policy factories and a transport
//! [`Sender`]. Every send builds a fresh chain of policies from the factories,
//! so cross-cutting behavior (logging, retries, time budgets, headers) is
//! layered in without touching call sites and without shared mutable state
//! between concurrent sends.
//!
//! ## Features
//!
//! - Per-send policy chains with onion ordering: requests flow through
//!   policies in declared order, responses in reverse
//! - A method marker where a call site may splice in its own policy
//! - Retry on HTTP 503 and transient transport errors with capped exponential
//!   backoff
//! - Overall time budget across retries, with an optional per-attempt timeout
//! - Cooperative cancellation and deadlines via [`Context`]
//! - Rewindable request bodies, resent from their start on every attempt
//! - A hyper-based HTTP/1.1 transport with rustls
//!
//! ## Example
//!
//! ```ignore
//! use request_policy::{
//!     Context, LoggingFactory, Pipeline, Request, RetryFactory, RetryOptions,
//!     TimeLimitFactory, TimeLimitOptions,
//! };
//! use std::time::Duration;
//!
//! let pipeline = Pipeline::builder()
//!     .with_policy(RetryFactory::new(RetryOptions::default()))
//!     .with_policy(TimeLimitFactory::new(TimeLimitOptions::new(Duration::from_secs(30))))
//!     .with_method_marker()
//!     .with_policy(LoggingFactory::default())
//!     .build()?;
//!
//! let response = pipeline
//!     .send_request(&Context::none(), Request::get("https://example.com/items".parse()?))
//!     .await?;
//!
//! if response.status().is_success() {
//!     let body = request_policy::response::collect(response).await?;
//!     println!("{} bytes", body.len());
//! }
//! ```
//!
//! ## Method policies
//!
//! ```ignore
//! use request_policy::{Context, HeaderFactory, Pipeline, Request};
//!
//! // Adds a header to this one call only, at the marker position.
//! let method = HeaderFactory::new("x-ms-version", "2017-04-17");
//! let response = pipeline
//!     .send(&Context::none(), Request::get(uri), Some(&method))
//!     .await?;
//! ```
//!
//! ## Custom senders
//!
//! ```ignore
//! use request_policy::{Pipeline, response, sender_fn};
//! use http::StatusCode;
//!
//! let pipeline = Pipeline::builder()
//!     .with_sender(sender_fn(|_request| async {
//!         Ok(response::empty(StatusCode::SERVICE_UNAVAILABLE))
//!     }))
//!     .build()?;
//! ```

pub mod config;
mod context;
mod error;
mod pipeline;
pub mod policies;
mod policy;
mod request;
pub mod response;
pub mod transport;

pub use context::Context;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use policy::{BoxFuture, Factory, Next, Policy, PolicyFactory};
pub use request::{BodyStream, Request, RequestBody};
pub use response::{Response, ResponseBody};

pub use config::{RetryOptions, TimeLimitOptions};
pub use policies::{
    HeaderFactory, Logger, LoggingFactory, RetryFactory, TimeLimitFactory, TracingLogger,
};
pub use transport::{
    HyperTransport, HyperTransportBuilder, Sender, SenderFn, TlsClientConfig, TransportBody,
    sender_fn,
};

pub use tokio_util::sync::CancellationToken;
