//! Server-side core of the mutual-TLS echo service.
//!
//! Provides the engine consumed by the `mtls-echo` binary:
//!
//! - TCP listener ownership and the sequential accept loop
//! - Server-side mTLS handshake (client certificate mandatory)
//! - The echo session loop and its teardown semantics
//!
//! One connection is serviced end-to-end (handshake, echo exchange,
//! teardown) before the next accept; a failed connection never stops the
//! listener.

pub mod acceptor;
pub mod error;
pub mod session;

pub use acceptor::Acceptor;
pub use error::ServerError;
pub use session::{EchoOutcome, ServerSession, SessionEnd};
