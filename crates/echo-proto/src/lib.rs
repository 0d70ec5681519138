//! Shared mutual-TLS primitives for the echo service.
//!
//! Used by both `echo-server-core` and `echo-client-core`:
//!
//! - PEM identity loading and trust-anchor validation
//! - rustls config builders for each role (mTLS, resumption disabled)
//! - Direct-issuer (chain depth 1) certificate verifiers
//! - Blocking handshake driver and failure classification
//! - Verified peer subject extraction

pub mod error;
pub mod identity;
pub mod tls;

pub use error::SetupError;
pub use identity::{Identity, Role, TrustConfig};

/// Fixed size in bytes of one echo frame.
///
/// Client input is truncated to this bound (terminator included) before
/// transmission; both session loops read at most this much per call.
pub const MAX_PAYLOAD: usize = 128;
