//! Error types for identity loading and TLS configuration.

use thiserror::Error;

/// Errors that can occur while building a role's TLS setup.
///
/// The first four variants mirror the ordered validation sequence in
/// [`TrustConfig::load`](crate::identity::TrustConfig::load); each step's
/// failure is terminal and distinct.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to load trust anchor: {0}")]
    TrustLoad(String),

    #[error("failed to load certificate: {0}")]
    CertLoad(String),

    #[error("failed to load private key: {0}")]
    KeyLoad(String),

    #[error("certificate and private key do not match: {0}")]
    KeyMismatch(String),

    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),

    #[error("certificate parse error: {0}")]
    CertificateParse(String),
}

/// Result type alias using [`SetupError`].
pub type Result<T> = std::result::Result<T, SetupError>;
