//! TLS connector setup for the hyper transport.
//!
//! # Feature Flags
//!
//! - **Crypto providers** (choose one): `tls-ring` (default via `tls`),
//!   `tls-aws-lc`
//! - **Root certificates** (choose one): `tls-native-roots` (default via
//!   `tls`), `tls-webpki-roots`
//!
//! Without a feature-gated provider, a process-wide default installed with
//! `rustls::crypto::CryptoProvider::install_default()` is used.

use std::sync::Arc;
use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

/// Returns true if a crypto provider and root certificates are compiled in.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))
}

fn crypto_provider() -> Option<Arc<CryptoProvider>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = CryptoProvider::get_default().cloned();

    provider
}

fn config_builder(
    provider: Arc<CryptoProvider>,
) -> Option<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .ok()
}

fn root_store() -> rustls::RootCertStore {
    #[allow(unused_mut)]
    let mut roots = rustls::RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let native = rustls_native_certs::load_native_certs();
        if !native.errors.is_empty() {
            tracing::debug!(errors = ?native.errors, "some native certificates failed to load");
        }
        roots.add_parsable_certificates(native.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    roots
}

/// Build the default TLS configuration.
///
/// Returns `None` when no crypto provider is available or no root certificate
/// feature is enabled, since an empty root store rejects every server.
pub fn default_tls_config() -> Option<ClientConfig> {
    if !cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots")) {
        tracing::debug!("no root certificate feature enabled, skipping default TLS config");
        return None;
    }
    Some(
        config_builder(crypto_provider()?)?
            .with_root_certificates(root_store())
            .with_no_client_auth(),
    )
}

/// Skips certificate chain and hostname validation. Handshake signatures are
/// still checked with the provider's algorithms.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Build a TLS configuration that accepts any server certificate.
///
/// # Warning
///
/// Only for development against self-signed endpoints. The connection is open
/// to man-in-the-middle attacks.
pub fn danger_accept_invalid_certs_config() -> Option<ClientConfig> {
    let provider = crypto_provider()?;
    let verifier = Arc::new(AcceptAnyServerCert {
        provider: provider.clone(),
    });
    Some(
        config_builder(provider)?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth(),
    )
}

/// Build an HTTPS-or-HTTP, HTTP/1.1 connector.
///
/// `http://` URLs are connected in plain text; `https://` URLs use `tls_config`.
pub fn build_https_connector(
    tls_config: ClientConfig,
    connect_timeout: Option<Duration>,
) -> HttpsConnector<HttpConnector> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(connect_timeout);

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http)
}
