//! Fixed request headers applied on every attempt.

use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::policy::{BoxFuture, Next, Policy, PolicyFactory};
use crate::{Context, PipelineError, Request, Response};

/// Sets fixed headers on every attempt.
///
/// Existing values for the same names are replaced.
///
/// # Example
///
/// ```ignore
/// use request_policy::{HeaderFactory, Pipeline};
///
/// let pipeline = Pipeline::builder()
///     .with_policy(HeaderFactory::new("user-agent", "inventory-client/1.0"))
///     .build()?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct HeaderFactory {
    headers: Arc<HeaderMap>,
}

impl HeaderFactory {
    /// Create a factory setting one header.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn new(name: &str, value: &str) -> Self {
        Self::from_parts(
            name.parse().expect("invalid header name"),
            value.parse().expect("invalid header value"),
        )
    }

    /// Create a factory setting one header, rejecting invalid input.
    pub fn try_new(name: &str, value: &str) -> Result<Self, PipelineError> {
        let name: HeaderName = name
            .parse()
            .map_err(|_| PipelineError::config(format!("invalid header name: {name}")))?;
        let value: HeaderValue = value
            .parse()
            .map_err(|_| PipelineError::config(format!("invalid header value: {value}")))?;
        Ok(Self::from_parts(name, value))
    }

    /// Create a factory from a pre-parsed header.
    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        Self::from_headers(headers)
    }

    /// Create a factory setting every header in `headers`.
    pub fn from_headers(headers: HeaderMap) -> Self {
        Self {
            headers: Arc::new(headers),
        }
    }

    /// Add another header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.headers).insert(name, value);
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl PolicyFactory for HeaderFactory {
    fn create(&self, next: Next) -> Box<dyn Policy> {
        Box::new(HeaderPolicy {
            next,
            headers: self.headers.clone(),
        })
    }
}

struct HeaderPolicy {
    next: Next,
    headers: Arc<HeaderMap>,
}

impl Policy for HeaderPolicy {
    fn send<'a>(
        &'a mut self,
        ctx: &'a Context,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Response, PipelineError>> {
        request.headers_mut().extend((*self.headers).clone());
        self.next.send(ctx, request)
    }
}
