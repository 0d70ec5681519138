//! Direct-issuer certificate verifiers (chain depth 1).
//!
//! `DirectIssuerServerVerifier` (client-side) and
//! `DirectIssuerClientVerifier` (server-side) wrap the stock webpki
//! verifiers and additionally reject any presented intermediate: only a
//! leaf signed directly by the configured trust anchor is accepted.
//! Signature verification and chain validation stay delegated to webpki
//! backed by the ring provider.

use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{
    CertificateError, DigitallySignedStruct, DistinguishedName, Error as TlsError, OtherError,
    SignatureScheme,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

/// The peer presented a chain deeper than the accepted depth of 1.
#[derive(Debug)]
struct ChainTooDeep {
    intermediates: usize,
}

impl fmt::Display for ChainTooDeep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "certificate chain depth exceeds 1 ({} intermediate(s) presented)",
            self.intermediates
        )
    }
}

impl std::error::Error for ChainTooDeep {}

/// Reject chains with intermediates before webpki sees them.
///
/// Shared depth check used by both sides. An intermediate between the leaf
/// and the trust anchor means chain depth > 1, which this service refuses
/// regardless of whether the chain would otherwise validate. Surfaced as a
/// certificate error so it classifies as a verification failure.
fn reject_intermediates(intermediates: &[CertificateDer<'_>]) -> Result<(), TlsError> {
    if intermediates.is_empty() {
        return Ok(());
    }
    Err(TlsError::InvalidCertificate(CertificateError::Other(
        OtherError(Arc::new(ChainTooDeep {
            intermediates: intermediates.len(),
        })),
    )))
}

// ---------------------------------------------------------------------------
// Client-side: verifies the server's certificate
// ---------------------------------------------------------------------------

/// Server certificate verifier that accepts only anchor-signed leaves.
#[derive(Debug)]
pub struct DirectIssuerServerVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl DirectIssuerServerVerifier {
    pub fn new(inner: Arc<WebPkiServerVerifier>) -> Self {
        Self { inner }
    }
}

impl ServerCertVerifier for DirectIssuerServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        reject_intermediates(intermediates)?;
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

// ---------------------------------------------------------------------------
// Server-side: verifies the client's certificate
// ---------------------------------------------------------------------------

/// Client certificate verifier that mandates a certificate and accepts only
/// anchor-signed leaves.
///
/// The inner webpki verifier keeps client auth mandatory (a handshake
/// without a client certificate fails verification) and advertises the
/// trust anchor's subject as the acceptable-issuer hint.
#[derive(Debug)]
pub struct DirectIssuerClientVerifier {
    inner: Arc<dyn ClientCertVerifier>,
}

impl DirectIssuerClientVerifier {
    pub fn new(inner: Arc<dyn ClientCertVerifier>) -> Self {
        Self { inner }
    }
}

impl ClientCertVerifier for DirectIssuerClientVerifier {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        self.inner.root_hint_subjects()
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, TlsError> {
        reject_intermediates(intermediates)?;
        self.inner.verify_client_cert(end_entity, intermediates, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
