//! TCP listener ownership and the sequential accept loop.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};
use crate::session::{EchoOutcome, ServerSession};

/// Owns the listening socket and processes connections one at a time.
///
/// Each accepted connection runs to completion (handshake, echo loop,
/// teardown) before the next `accept` call. A failure on one connection is
/// logged and contained; only listener creation itself is fatal.
pub struct Acceptor {
    listener: TcpListener,
    config: Arc<rustls::ServerConfig>,
}

impl Acceptor {
    /// Bind the listener on `0.0.0.0:port`.
    ///
    /// Port 0 is rejected before any socket is created; a bind failure
    /// aborts startup and is not retried.
    pub fn bind(port: u16, config: Arc<rustls::ServerConfig>) -> Result<Self> {
        if port == 0 {
            return Err(ServerError::Config(
                "port must be in the range 1-65535".into(),
            ));
        }

        let listener = TcpListener::bind(("0.0.0.0", port))
            .map_err(|e| ServerError::Bind(format!("port {port}: {e}")))?;

        info!(port, "listening");

        Ok(Self { listener, config })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))
    }

    /// Accept and fully service one connection.
    ///
    /// Teardown runs on every exit path of the session; on handshake
    /// failure the raw stream is simply dropped.
    pub fn accept_one(&self) -> Result<EchoOutcome> {
        let (tcp, peer_addr) = self
            .listener
            .accept()
            .map_err(|e| ServerError::Accept(e.to_string()))?;

        debug!(peer = %peer_addr, "connection accepted");

        let mut session = ServerSession::establish(self.config.clone(), tcp, peer_addr)?;
        let outcome = session.echo_loop();
        session.shutdown();

        Ok(outcome)
    }

    /// Run the accept loop until `stop` is set.
    ///
    /// The flag is checked between connections; per-connection failures
    /// (accept, handshake, session) never terminate the loop. `on_session`
    /// is invoked after each completed session so the caller can surface
    /// status on its own output.
    pub fn run<F>(&self, stop: &AtomicBool, mut on_session: F)
    where
        F: FnMut(&EchoOutcome),
    {
        while !stop.load(Ordering::Relaxed) {
            match self.accept_one() {
                Ok(outcome) => {
                    info!(
                        state = ?outcome.end,
                        peer = %outcome.peer_addr,
                        payload = %String::from_utf8_lossy(&outcome.last_payload).trim_end(),
                        "session finished"
                    );
                    on_session(&outcome);
                }
                Err(err) => {
                    warn!(error = %err, "connection failed");
                }
            }
        }
        info!("accept loop stopped");
    }
}
