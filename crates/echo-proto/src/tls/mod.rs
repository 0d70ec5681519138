//! TLS layer: config builders, direct-issuer verifiers, handshake driver.

pub mod config;
pub mod handshake;
pub mod verifier;

pub use config::{build_client_config, build_server_config};
pub use handshake::{drive_handshake, peer_subject, HandshakeFailure};
