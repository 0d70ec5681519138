//! Blocking handshake driver and failure classification.
//!
//! Both roles drive the TLS handshake over an established byte stream with
//! [`drive_handshake`]: a blocking `complete_io` loop that retries partial
//! record reads and writes internally, so the caller only ever sees a
//! finished handshake or a classified failure.
//!
//! Classification splits failures into two kinds: the peer's certificate
//! (or its absence) failed verification, or the TLS exchange itself broke
//! down. The role crates map these onto their own error taxonomies.

use std::io::{Read, Write};

use rustls::{AlertDescription, ConnectionCommon, Error as TlsError};
use rustls_pki_types::CertificateDer;
use tracing::trace;
use x509_parser::prelude::*;

use crate::error::SetupError;

/// A classified handshake failure.
#[derive(Debug)]
pub enum HandshakeFailure {
    /// Certificate verification did not yield a valid result: the peer's
    /// chain was rejected, no client certificate was presented, or the
    /// peer refused our certificate.
    Verification(String),
    /// No valid TLS exchange completed: transport error or protocol
    /// breakdown before verification could conclude.
    Protocol(String),
}

/// Drive the TLS handshake to completion over a blocking stream.
///
/// Loops `complete_io` until the connection leaves the handshaking state.
/// Partial reads and writes are absorbed by the loop; renegotiation never
/// occurs (rustls does not implement it).
pub fn drive_handshake<Data, S>(
    conn: &mut ConnectionCommon<Data>,
    sock: &mut S,
) -> Result<(), HandshakeFailure>
where
    S: Read + Write,
{
    while conn.is_handshaking() {
        let (bytes_read, bytes_written) =
            conn.complete_io(sock).map_err(classify_handshake_error)?;
        trace!(bytes_read, bytes_written, "handshake io round");
    }
    Ok(())
}

/// Classify an I/O error surfaced by `complete_io`.
///
/// rustls wraps its own errors in `io::Error`; unwrap and inspect them.
/// Anything that is not recognizably a verification outcome counts as a
/// protocol failure.
pub fn classify_handshake_error(err: std::io::Error) -> HandshakeFailure {
    let tls_err = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<TlsError>());

    match tls_err {
        Some(e @ TlsError::InvalidCertificate(_)) => HandshakeFailure::Verification(e.to_string()),
        Some(e @ TlsError::NoCertificatesPresented) => {
            HandshakeFailure::Verification(e.to_string())
        }
        Some(e @ TlsError::AlertReceived(alert)) if is_certificate_alert(*alert) => {
            HandshakeFailure::Verification(e.to_string())
        }
        Some(e) => HandshakeFailure::Protocol(e.to_string()),
        None => HandshakeFailure::Protocol(err.to_string()),
    }
}

/// Alerts the peer sends when it rejects our certificate chain.
fn is_certificate_alert(alert: AlertDescription) -> bool {
    matches!(
        alert,
        AlertDescription::BadCertificate
            | AlertDescription::UnsupportedCertificate
            | AlertDescription::CertificateRevoked
            | AlertDescription::CertificateExpired
            | AlertDescription::CertificateUnknown
            | AlertDescription::UnknownCA
            | AlertDescription::AccessDenied
    )
}

/// Extract the subject of a verified peer certificate for display.
pub fn peer_subject(cert: &CertificateDer<'_>) -> Result<String, SetupError> {
    let (_, parsed) = X509Certificate::from_der(cert.as_ref())
        .map_err(|e| SetupError::CertificateParse(e.to_string()))?;
    Ok(parsed.subject().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn wrap(err: TlsError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }

    #[test]
    fn missing_client_cert_is_verification() {
        let failure = classify_handshake_error(wrap(TlsError::NoCertificatesPresented));
        assert!(matches!(failure, HandshakeFailure::Verification(_)));
    }

    #[test]
    fn bad_certificate_alert_is_verification() {
        let failure =
            classify_handshake_error(wrap(TlsError::AlertReceived(AlertDescription::BadCertificate)));
        assert!(matches!(failure, HandshakeFailure::Verification(_)));
    }

    #[test]
    fn unknown_ca_alert_is_verification() {
        let failure =
            classify_handshake_error(wrap(TlsError::AlertReceived(AlertDescription::UnknownCA)));
        assert!(matches!(failure, HandshakeFailure::Verification(_)));
    }

    #[test]
    fn handshake_failure_alert_is_protocol() {
        let failure = classify_handshake_error(wrap(TlsError::AlertReceived(
            AlertDescription::HandshakeFailure,
        )));
        assert!(matches!(failure, HandshakeFailure::Protocol(_)));
    }

    #[test]
    fn transport_error_is_protocol() {
        let failure = classify_handshake_error(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection reset",
        ));
        assert!(matches!(failure, HandshakeFailure::Protocol(_)));
    }

    #[test]
    fn peer_subject_reports_common_name() {
        use rcgen::{CertificateParams, DnType, KeyPair};

        let key = KeyPair::generate().expect("key");
        let mut params = CertificateParams::new(vec![]).expect("params");
        params
            .distinguished_name
            .push(DnType::CommonName, "echo peer");
        let cert = params.self_signed(&key).expect("cert");

        let der = CertificateDer::from(cert.der().to_vec());
        let subject = peer_subject(&der).expect("subject");
        assert!(subject.contains("echo peer"));
    }

    #[test]
    fn peer_subject_rejects_garbage() {
        let der = CertificateDer::from(vec![0u8; 16]);
        assert!(peer_subject(&der).is_err());
    }
}
