//! Outbound request type carried through the policy chain.
//!
//! A [`Request`] describes one logical HTTP exchange. Policies receive it by
//! mutable reference and may rewrite its URI or headers; the terminal link
//! turns it into an `http::Request` for each physical attempt.
//!
//! # Rewindable bodies
//!
//! Retrying resends the same logical body, so the body must be readable from
//! its start once per attempt:
//!
//! - [`RequestBody::Empty`] and [`RequestBody::Full`] are trivially rewindable.
//! - [`RequestBody::Replayable`] holds a stream factory; every attempt gets a
//!   fresh stream positioned at the beginning.
//! - [`RequestBody::OneShot`] wraps a stream that can be consumed once. A second
//!   attempt fails with [`PipelineError::Body`], and the retry policy does not
//!   retry such requests.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};

use crate::PipelineError;
use crate::transport::TransportBody;

/// A boxed stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, PipelineError>> + Send>>;

type StreamFactory = Arc<dyn Fn() -> BodyStream + Send + Sync>;

/// The body of a [`Request`].
#[derive(Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A complete in-memory body.
    Full(Bytes),
    /// A streaming body that can be restarted from the beginning.
    Replayable(StreamFactory),
    /// A streaming body that can be sent only once. `None` once consumed.
    OneShot(Option<BodyStream>),
}

impl RequestBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        RequestBody::Empty
    }

    /// Create an in-memory body.
    pub fn full(data: impl Into<Bytes>) -> Self {
        RequestBody::Full(data.into())
    }

    /// Create a streaming body from a factory called once per attempt.
    ///
    /// Each call must yield the body from its first byte.
    pub fn replayable<F, S>(make_stream: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Result<Bytes, PipelineError>> + Send + 'static,
    {
        RequestBody::Replayable(Arc::new(move || Box::pin(make_stream()) as BodyStream))
    }

    /// Create a streaming body that can only be sent once.
    pub fn one_shot<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, PipelineError>> + Send + 'static,
    {
        RequestBody::OneShot(Some(Box::pin(stream)))
    }

    /// Whether the body can be sent again from its start.
    pub fn is_rewindable(&self) -> bool {
        !matches!(self, RequestBody::OneShot(_))
    }

    /// Produce the body for the next attempt, positioned at its start.
    pub(crate) fn for_attempt(&mut self) -> Result<TransportBody, PipelineError> {
        match self {
            RequestBody::Empty => Ok(TransportBody::empty()),
            RequestBody::Full(data) => Ok(TransportBody::full(data.clone())),
            RequestBody::Replayable(make_stream) => Ok(TransportBody::from_stream(make_stream())),
            RequestBody::OneShot(stream) => stream
                .take()
                .map(TransportBody::from_stream)
                .ok_or_else(|| {
                    PipelineError::body("one-shot request body was already sent and cannot be rewound")
                }),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(data: Bytes) -> Self {
        RequestBody::Full(data)
    }
}

impl From<String> for RequestBody {
    fn from(data: String) -> Self {
        RequestBody::Full(Bytes::from(data))
    }
}

impl From<&'static str> for RequestBody {
    fn from(data: &'static str) -> Self {
        RequestBody::Full(Bytes::from_static(data.as_bytes()))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "RequestBody::Empty"),
            RequestBody::Full(data) => f
                .debug_struct("RequestBody::Full")
                .field("len", &data.len())
                .finish(),
            RequestBody::Replayable(_) => write!(f, "RequestBody::Replayable"),
            RequestBody::OneShot(stream) => f
                .debug_struct("RequestBody::OneShot")
                .field("consumed", &stream.is_none())
                .finish(),
        }
    }
}

/// One logical outbound HTTP request.
///
/// # Example
///
/// ```
/// use request_policy::{Request, RequestBody};
/// use http::{Method, header};
///
/// let request = Request::new(Method::PUT, "https://management.example.com/items/1".parse().unwrap())
///     .header(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"))
///     .body(RequestBody::full(r#"{"name":"item"}"#));
///
/// assert!(request.body_ref().is_rewindable());
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: RequestBody,
}

impl Request {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Create a GET request.
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn uri_mut(&mut self) -> &mut Uri {
        &mut self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body_ref(&self) -> &RequestBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    /// Build the wire request for one attempt, rewinding the body.
    pub(crate) fn to_http(&mut self) -> Result<http::Request<TransportBody>, PipelineError> {
        let body = self.body.for_attempt()?;
        let mut request = http::Request::new(body);
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        Ok(request)
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: Into<RequestBody>,
{
    fn from(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body: body.into(),
        }
    }
}
