//! Client endpoint: dial, handshake, hand back an authenticated session.

use std::fmt;
use std::net::TcpStream;
use std::str::FromStr;
use std::sync::Arc;

use echo_proto::tls::{drive_handshake, peer_subject, HandshakeFailure};
use rustls::pki_types::ServerName;
use rustls::ClientConnection;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::session::EchoSession;

/// A parsed `host:port` connection target.
///
/// The host doubles as the TLS server name presented during the handshake;
/// it may be a DNS name or an IP address.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
}

impl FromStr for ConnectTarget {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ClientError::Config(format!("expected host:port, got {s:?}")))?;

        // Bracketed IPv6 literals: "[::1]:9443" names the host "::1".
        let host = host
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return Err(ClientError::Config(format!("empty host in {s:?}")));
        }

        let port: u16 = port
            .parse()
            .map_err(|_| ClientError::Config(format!("invalid port in {s:?}")))?;
        if port == 0 {
            return Err(ClientError::Config(
                "port must be in the range 1-65535".into(),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A client endpoint that connects to the echo server.
pub struct ClientEndpoint {
    config: Arc<rustls::ClientConfig>,
}

impl ClientEndpoint {
    pub fn new(config: Arc<rustls::ClientConfig>) -> Self {
        Self { config }
    }

    /// Dial the target and perform the mTLS handshake.
    ///
    /// Returns an authenticated [`EchoSession`] after the server's
    /// certificate chains (depth 1) to the trust anchor; on failure the
    /// raw stream is dropped here and no session exists. The target is
    /// logged once on success.
    pub fn connect(&self, target: &ConnectTarget) -> Result<EchoSession> {
        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|e| ClientError::Config(format!("invalid server name: {e}")))?;

        let mut tcp = TcpStream::connect((target.host.as_str(), target.port))
            .map_err(|e| ClientError::Connect(format!("{target}: {e}")))?;

        let mut conn = ClientConnection::new(self.config.clone(), server_name)
            .map_err(|e| ClientError::HandshakeProtocol(e.to_string()))?;

        drive_handshake(&mut *conn, &mut tcp).map_err(|failure| match failure {
            HandshakeFailure::Verification(msg) => ClientError::HandshakeVerification(msg),
            HandshakeFailure::Protocol(msg) => ClientError::HandshakeProtocol(msg),
        })?;

        let peer_identity = conn
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| peer_subject(cert).unwrap_or_else(|_| "<unparsed>".into()))
            .unwrap_or_else(|| "<unknown>".into());

        info!(%target, identity = %peer_identity, "handshake successful");

        Ok(EchoSession::new(conn, tcp, peer_identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parses_host_and_port() {
        let target: ConnectTarget = "example.net:9443".parse().expect("parse");
        assert_eq!(target.host, "example.net");
        assert_eq!(target.port, 9443);
    }

    #[test]
    fn ipv6_target_uses_last_colon() {
        let target: ConnectTarget = "::1:9443".parse().expect("parse");
        assert_eq!(target.host, "::1");
        assert_eq!(target.port, 9443);
    }

    #[test]
    fn bracketed_ipv6_target_strips_brackets() {
        let target: ConnectTarget = "[::1]:9443".parse().expect("parse");
        assert_eq!(target.host, "::1");
        assert_eq!(target.port, 9443);
    }

    #[test]
    fn empty_bracketed_host_is_config_error() {
        let result: Result<ConnectTarget> = "[]:9443".parse();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn missing_port_is_config_error() {
        let result: Result<ConnectTarget> = "example.net".parse();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn port_zero_is_config_error() {
        let result: Result<ConnectTarget> = "example.net:0".parse();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn non_numeric_port_is_config_error() {
        let result: Result<ConnectTarget> = "example.net:echo".parse();
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn display_round_trips() {
        let target: ConnectTarget = "localhost:9443".parse().expect("parse");
        assert_eq!(target.to_string(), "localhost:9443");
    }
}
