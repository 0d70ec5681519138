//! Authenticated server session and the echo loop.
//!
//! A `ServerSession` exists only after a successful mTLS handshake. The
//! echo loop reads at most [`MAX_PAYLOAD`] bytes at a time and writes each
//! chunk straight back; it ends in one of two terminal states and teardown
//! runs unconditionally afterwards.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use echo_proto::tls::{drive_handshake, peer_subject, HandshakeFailure};
use echo_proto::MAX_PAYLOAD;
use rustls::{ServerConnection, StreamOwned};
use tracing::{info, warn};

use crate::error::{Result, ServerError};

/// Terminal state of an echo session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the session; the loop exited normally.
    Closed,
    /// A read failed, or a write failed or came up short. No retry.
    Errored,
}

/// What one finished session looked like, surfaced once for observability.
#[derive(Debug)]
pub struct EchoOutcome {
    pub end: SessionEnd,
    /// The last buffer received before the loop exited (may be empty).
    pub last_payload: Vec<u8>,
    /// Address of the peer the session was with.
    pub peer_addr: SocketAddr,
    /// Verified certificate subject of the peer.
    pub peer_identity: String,
}

/// An authenticated, encrypted session with a verified client.
pub struct ServerSession {
    stream: StreamOwned<ServerConnection, TcpStream>,
    peer_addr: SocketAddr,
    peer_identity: String,
}

impl ServerSession {
    /// Perform the server side of the mTLS handshake on an accepted stream.
    ///
    /// On failure the raw stream is dropped here; no session exists. On
    /// success the peer's address is logged once.
    pub fn establish(
        config: Arc<rustls::ServerConfig>,
        mut tcp: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<Self> {
        let mut conn = ServerConnection::new(config)
            .map_err(|e| ServerError::HandshakeProtocol(e.to_string()))?;

        drive_handshake(&mut *conn, &mut tcp).map_err(|failure| match failure {
            HandshakeFailure::Verification(msg) => ServerError::HandshakeVerification(msg),
            HandshakeFailure::Protocol(msg) => ServerError::HandshakeProtocol(msg),
        })?;

        // Client auth is mandatory, so a certificate is present here.
        let peer_identity = conn
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| peer_subject(cert).unwrap_or_else(|_| "<unparsed>".into()))
            .unwrap_or_else(|| "<unknown>".into());

        info!(peer = %peer_addr, identity = %peer_identity, "handshake successful");

        Ok(Self {
            stream: StreamOwned::new(conn, tcp),
            peer_addr,
            peer_identity,
        })
    }

    /// The address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The verified certificate subject of the connected peer.
    pub fn peer_identity(&self) -> &str {
        &self.peer_identity
    }

    /// Run the echo loop until the peer closes or an error occurs.
    pub fn echo_loop(&mut self) -> EchoOutcome {
        let (end, last_payload) = echo_exchange(&mut self.stream);
        EchoOutcome {
            end,
            last_payload,
            peer_addr: self.peer_addr,
            peer_identity: self.peer_identity.clone(),
        }
    }

    /// Graceful teardown: send close_notify, flush, release the stream.
    pub fn shutdown(mut self) {
        self.stream.conn.send_close_notify();
        if let Err(e) = self.stream.conn.complete_io(&mut self.stream.sock) {
            // The peer may already be gone; teardown is best-effort.
            warn!(peer = %self.peer_addr, error = %e, "close_notify not delivered");
        }
    }
}

/// The echo loop proper, generic over the stream for testability.
///
/// Per-session scoped buffer; no state survives the call.
fn echo_exchange<S: Read + Write>(stream: &mut S) -> (SessionEnd, Vec<u8>) {
    let mut buf = [0u8; MAX_PAYLOAD];
    let mut last_payload = Vec::new();

    loop {
        match stream.read(&mut buf) {
            // Zero bytes: the peer closed the session.
            Ok(0) => return (SessionEnd::Closed, last_payload),
            Ok(n) => {
                last_payload.clear();
                last_payload.extend_from_slice(&buf[..n]);
                match stream.write(&buf[..n]) {
                    Ok(written) if written == n => {}
                    Ok(written) => {
                        warn!(expected = n, written, "short write, ending session");
                        return (SessionEnd::Errored, last_payload);
                    }
                    Err(e) => {
                        warn!(error = %e, "session write failed");
                        return (SessionEnd::Errored, last_payload);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "session read failed");
                return (SessionEnd::Errored, last_payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Scripted stream: a queue of read results and a cap on write size.
    struct ScriptedStream {
        reads: VecDeque<io::Result<Vec<u8>>>,
        write_cap: usize,
        written: Vec<u8>,
    }

    impl ScriptedStream {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                write_cap: usize::MAX,
                written: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.write_cap);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn peer_close_ends_in_closed_with_no_write() {
        let mut stream = ScriptedStream::new(vec![Ok(vec![])]);
        let (end, last_payload) = echo_exchange(&mut stream);
        assert_eq!(end, SessionEnd::Closed);
        assert!(last_payload.is_empty());
        assert!(stream.written.is_empty());
    }

    #[test]
    fn received_bytes_are_echoed_back() {
        let mut stream = ScriptedStream::new(vec![Ok(b"ping\n".to_vec())]);
        let (end, last_payload) = echo_exchange(&mut stream);
        assert_eq!(end, SessionEnd::Closed);
        assert_eq!(last_payload, b"ping\n");
        assert_eq!(stream.written, b"ping\n");
    }

    #[test]
    fn last_payload_tracks_final_frame() {
        let mut stream =
            ScriptedStream::new(vec![Ok(b"first".to_vec()), Ok(b"second".to_vec())]);
        let (end, last_payload) = echo_exchange(&mut stream);
        assert_eq!(end, SessionEnd::Closed);
        assert_eq!(last_payload, b"second");
        assert_eq!(stream.written, b"firstsecond");
    }

    #[test]
    fn read_error_ends_in_errored() {
        let mut stream = ScriptedStream::new(vec![Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        ))]);
        let (end, _) = echo_exchange(&mut stream);
        assert_eq!(end, SessionEnd::Errored);
    }

    #[test]
    fn short_write_ends_in_errored_without_retry() {
        let mut stream = ScriptedStream::new(vec![Ok(b"payload".to_vec()), Ok(b"more".to_vec())]);
        stream.write_cap = 3;
        let (end, last_payload) = echo_exchange(&mut stream);
        assert_eq!(end, SessionEnd::Errored);
        assert_eq!(last_payload, b"payload");
        // Only the one truncated attempt; the second read never happens.
        assert_eq!(stream.written, b"pay");
    }
}
