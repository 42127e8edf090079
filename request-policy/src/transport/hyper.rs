//! Hyper-based default sender.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use rustls::ClientConfig;
use tower_service::Service;

use super::body::TransportBody;
use super::connector::{
    build_https_connector, danger_accept_invalid_certs_config, default_tls_config,
};
use super::sender::Sender;
use crate::policy::BoxFuture;
use crate::{PipelineError, Response, ResponseBody};

type HyperClient = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// Sender backed by hyper_util's legacy client.
///
/// The returned future resolves as soon as response headers arrive; the body
/// is streamed afterwards through the [`ResponseBody`](crate::ResponseBody).
///
/// # Example
///
/// ```ignore
/// use request_policy::{HyperTransport, Pipeline};
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .connect_timeout(Duration::from_secs(5))
///     .build()?;
///
/// let pipeline = Pipeline::builder().with_sender(transport).build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a transport with default settings.
    pub fn new() -> Result<Self, PipelineError> {
        Self::builder().build()
    }

    /// Send one request and wait for the response headers.
    pub async fn request(
        &self,
        request: http::Request<TransportBody>,
    ) -> Result<Response, PipelineError> {
        send_with(&self.client, request).await
    }
}

async fn send_with(
    client: &HyperClient,
    request: http::Request<TransportBody>,
) -> Result<Response, PipelineError> {
    let response = client.request(request).await.map_err(classify_client_error)?;
    Ok(response.map(into_response_body))
}

/// Box hyper's streaming body; read failures after the headers are not transient.
fn into_response_body(body: Incoming) -> ResponseBody {
    body.map_err(|e: hyper::Error| PipelineError::transport(format!("response body: {e}")))
        .boxed_unsync()
}

/// Failures to establish a connection never reached the peer and are safe to
/// resend; anything later is not.
fn classify_client_error(err: hyper_util::client::legacy::Error) -> PipelineError {
    if err.is_connect() {
        tracing::debug!(error = %err, "connection attempt failed");
        PipelineError::transient_transport(format!("connect failed: {err}"))
    } else {
        tracing::debug!(error = %err, "request failed");
        PipelineError::transport(format!("request failed: {err}"))
    }
}

impl Sender for HyperTransport {
    fn send(
        &self,
        request: http::Request<TransportBody>,
    ) -> BoxFuture<'static, Result<Response, PipelineError>> {
        let client = self.client.clone();
        Box::pin(async move { send_with(&client, request).await })
    }
}

impl Service<http::Request<TransportBody>> for HyperTransport {
    type Response = Response;
    type Error = PipelineError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<TransportBody>) -> Self::Future {
        <Self as Sender>::send(self, request)
    }
}

/// Builder for [`HyperTransport`].
#[derive(Default)]
pub struct HyperTransportBuilder {
    tls_config: Option<ClientConfig>,
    connect_timeout: Option<Duration>,
    danger_accept_invalid_certs: bool,
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom TLS configuration instead of the feature-selected default.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Accept any server certificate.
    ///
    /// # Warning
    ///
    /// Development only. Takes precedence over [`tls_config`](Self::tls_config).
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.danger_accept_invalid_certs = true;
        self
    }

    /// Bound the time spent establishing a connection.
    ///
    /// Expiry is reported as a transient transport error.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the transport.
    ///
    /// Fails with [`PipelineError::Config`] when no TLS configuration was
    /// given and none can be built from the enabled features.
    pub fn build(self) -> Result<HyperTransport, PipelineError> {
        let tls_config = if self.danger_accept_invalid_certs {
            danger_accept_invalid_certs_config()
        } else {
            self.tls_config.or_else(default_tls_config)
        }
        .ok_or_else(|| {
            PipelineError::config(
                "no TLS configuration: enable the `tls` feature or install a rustls crypto provider",
            )
        })?;

        let connector = build_https_connector(tls_config, self.connect_timeout);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(HyperTransport { client })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .field("danger_accept_invalid_certs", &self.danger_accept_invalid_certs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperTransportBuilder::new();
        assert!(builder.tls_config.is_none());
        assert!(builder.connect_timeout.is_none());
        assert!(!builder.danger_accept_invalid_certs);
    }

    #[test]
    fn test_builder_connect_timeout() {
        let builder = HyperTransportBuilder::new().connect_timeout(Duration::from_secs(3));
        assert_eq!(builder.connect_timeout, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_build_transport() {
        if super::super::has_tls_support() {
            assert!(HyperTransportBuilder::new().build().is_ok());
        } else if !cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots")) {
            let err = HyperTransportBuilder::new().build().unwrap_err();
            assert!(err.is_config());
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let Ok(transport) = HyperTransport::builder()
            .connect_timeout(Duration::from_millis(200))
            .build()
        else {
            return;
        };

        // Port 9 (discard) on loopback is closed on test machines.
        let request = http::Request::builder()
            .uri("http://127.0.0.1:9/")
            .body(TransportBody::empty())
            .unwrap();

        let err = transport.request(request).await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }
}
