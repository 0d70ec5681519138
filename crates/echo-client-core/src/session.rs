//! Authenticated client session: one bounded send-then-receive exchange.

use std::io::{Read, Write};
use std::net::TcpStream;

use echo_proto::MAX_PAYLOAD;
use rustls::{ClientConnection, StreamOwned};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// An authenticated, encrypted session with the echo server.
pub struct EchoSession {
    stream: StreamOwned<ClientConnection, TcpStream>,
    peer_identity: String,
}

impl EchoSession {
    pub(crate) fn new(conn: ClientConnection, tcp: TcpStream, peer_identity: String) -> Self {
        Self {
            stream: StreamOwned::new(conn, tcp),
            peer_identity,
        }
    }

    /// The verified certificate subject of the server.
    pub fn peer_identity(&self) -> &str {
        &self.peer_identity
    }

    /// Send one payload and read the echo back.
    ///
    /// The payload is truncated to [`MAX_PAYLOAD`] bytes (terminator
    /// included in the bound) before transmission. A short write is a
    /// [`ClientError::Write`] with no retry; a failed read is a
    /// [`ClientError::Read`]. Returns `Some(bytes)` only when the reply
    /// length equals the sent length -- a soft mismatch yields `None`, not
    /// an error.
    pub fn exchange(&mut self, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        exchange_once(&mut self.stream, payload)
    }

    /// Graceful teardown: send close_notify, flush, release the stream.
    ///
    /// Runs on every exit path, including after a failed exchange.
    pub fn shutdown(mut self) {
        self.stream.conn.send_close_notify();
        if let Err(e) = self.stream.conn.complete_io(&mut self.stream.sock) {
            warn!(error = %e, "close_notify not delivered");
        }
    }
}

/// The exchange proper, generic over the stream for testability.
fn exchange_once<S: Read + Write>(stream: &mut S, payload: &[u8]) -> Result<Option<Vec<u8>>> {
    let bounded = &payload[..payload.len().min(MAX_PAYLOAD)];
    if bounded.len() < payload.len() {
        debug!(
            sent = bounded.len(),
            dropped = payload.len() - bounded.len(),
            "input truncated to the frame bound"
        );
    }

    let written = stream
        .write(bounded)
        .map_err(|e| ClientError::Write(e.to_string()))?;
    if written != bounded.len() {
        return Err(ClientError::Write(format!(
            "short write: {written} of {} bytes accepted",
            bounded.len()
        )));
    }

    let mut buf = [0u8; MAX_PAYLOAD];
    let read = stream
        .read(&mut buf)
        .map_err(|e| ClientError::Read(e.to_string()))?;

    // Length equality stands in for a correct echo, as in the original
    // service. A mismatch is soft: surface nothing.
    if read == written {
        Ok(Some(buf[..read].to_vec()))
    } else {
        debug!(sent = written, received = read, "echo length mismatch");
        Ok(None)
    }
}
