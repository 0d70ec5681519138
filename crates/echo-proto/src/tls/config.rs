//! rustls configuration builders for the echo service.
//!
//! Constructs `rustls::ServerConfig` and `rustls::ClientConfig` with the
//! ring crypto provider, direct-issuer (depth 1) verifiers, and mandatory
//! mutual authentication. Session resumption is disabled on both sides;
//! rustls never supports renegotiation, so nothing to disable there.

use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::server::danger::ClientCertVerifier;
use rustls::server::{NoServerSessionStorage, WebPkiClientVerifier};

use crate::error::{Result, SetupError};
use crate::identity::Identity;
use crate::tls::verifier::{DirectIssuerClientVerifier, DirectIssuerServerVerifier};

/// Build a `rustls::ServerConfig` from a loaded server identity.
///
/// The config mandates a client certificate signed directly by the trust
/// anchor and advertises the anchor's subject as the acceptable-issuer
/// list during the client-certificate request.
pub fn build_server_config(identity: Identity) -> Result<Arc<rustls::ServerConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let webpki = WebPkiClientVerifier::builder_with_provider(
        Arc::new(identity.roots),
        provider.clone(),
    )
    .build()
    .map_err(|e| SetupError::TlsConfiguration(format!("client verifier: {e}")))?;

    let verifier: Arc<dyn ClientCertVerifier> =
        Arc::new(DirectIssuerClientVerifier::new(webpki));

    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| SetupError::TlsConfiguration(format!("protocol versions: {e}")))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(identity.cert_chain, identity.key)
        .map_err(|e| SetupError::TlsConfiguration(format!("server cert config: {e}")))?;

    // One fresh handshake per connection; no resumption state.
    config.session_storage = Arc::new(NoServerSessionStorage {});
    config.send_tls13_tickets = 0;

    Ok(Arc::new(config))
}

/// Build a `rustls::ClientConfig` from a loaded client identity.
///
/// The config presents the client certificate for mutual authentication
/// and verifies the server's certificate against the trust anchor with
/// chain depth fixed at 1.
pub fn build_client_config(identity: Identity) -> Result<Arc<rustls::ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let webpki = WebPkiServerVerifier::builder_with_provider(
        Arc::new(identity.roots),
        provider.clone(),
    )
    .build()
    .map_err(|e| SetupError::TlsConfiguration(format!("server verifier: {e}")))?;

    let verifier = Arc::new(DirectIssuerServerVerifier::new(webpki));

    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| SetupError::TlsConfiguration(format!("protocol versions: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_client_auth_cert(identity.cert_chain, identity.key)
        .map_err(|e| SetupError::TlsConfiguration(format!("client cert config: {e}")))?;

    config.resumption = rustls::client::Resumption::disabled();

    Ok(Arc::new(config))
}
