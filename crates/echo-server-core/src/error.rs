//! Error types for the server core.

use thiserror::Error;

/// Errors that can occur in the server core.
///
/// `Config`, `Bind`, and `Setup` are fatal at startup; the remaining
/// variants are scoped to a single connection and never stop the accept
/// loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind listener: {0}")]
    Bind(String),

    #[error("failed to accept connection: {0}")]
    Accept(String),

    #[error("handshake failed: {0}")]
    HandshakeProtocol(String),

    #[error("handshake verification failed: {0}")]
    HandshakeVerification(String),

    #[error("session read failed: {0}")]
    Read(String),

    #[error("session write failed: {0}")]
    Write(String),

    #[error(transparent)]
    Setup(#[from] echo_proto::SetupError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
