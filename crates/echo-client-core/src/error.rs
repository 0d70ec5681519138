//! Error types for the client core.

use thiserror::Error;

/// Errors that can occur in the client core. All are fatal for the
/// invocation; the client makes exactly one connection attempt.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("connection failed: {0}")]
    Connect(String),

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

pub type Result<T> = std::result::Result<T, ClientError>;
