//! Client-side core of the mutual-TLS echo service.
//!
//! Provides the engine consumed by the `mtls-echo` binary:
//!
//! - TCP dialing and the client-side mTLS handshake
//! - Target (`host:port`) parsing
//! - The single send-then-receive echo exchange with its bound and
//!   teardown semantics

pub mod endpoint;
pub mod error;
pub mod session;

pub use endpoint::{ClientEndpoint, ConnectTarget};
pub use error::ClientError;
pub use session::EchoSession;
