//! HTTP transport layer.
//!
//! The [`Sender`] trait is the leaf of every policy chain. [`HyperTransport`]
//! is the default implementation; [`SenderFn`] adapts closures for tests and
//! fault injection.
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots`
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates

mod body;
mod connector;
mod hyper;
mod sender;

pub use body::TransportBody;
pub use connector::{
    build_https_connector, danger_accept_invalid_certs_config, default_tls_config, has_tls_support,
};
pub use hyper::{HyperTransport, HyperTransportBuilder};
pub use sender::{Sender, SenderFn, sender_fn};

pub use rustls::ClientConfig as TlsClientConfig;
