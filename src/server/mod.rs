//! TCP server: accept loop and per-connection dispatch.
//!
//! # Data Flow
//! ```text
//! Listener::accept (bounded by max_connections)
//!     → ConnectionTracker::track
//!     → tokio::spawn(handler.handle(socket))
//!
//! On shutdown signal:
//!     stop accepting → wait drain_timeout for live connections
//! ```
//!
//! Handlers are not cancelled. One that should end early on shutdown has to
//! watch the signal itself, as `EchoHandler::with_shutdown` does.

pub mod handler;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::net::connection::{ConnectionTracker, DrainOutcome};
use crate::net::listener::{Listener, ListenerError};

pub use handler::{ConnectionHandler, EchoHandler};

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// TCP server that hands every accepted socket to a `ConnectionHandler`.
pub struct TcpServer {
    config: ServerConfig,
    tracker: ConnectionTracker,
}

impl TcpServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Bind a listener using this server's listener and socket settings.
    pub async fn bind(&self) -> Result<Listener, ListenerError> {
        Listener::bind(&self.config.listener, &self.config.socket).await
    }

    /// Run the accept loop until `shutdown` fires, then drain connections.
    ///
    /// A closed shutdown channel counts as a shutdown request.
    pub async fn run<H: ConnectionHandler>(
        &self,
        listener: Listener,
        handler: H,
        mut shutdown: broadcast::Receiver<()>,
    ) -> DrainOutcome {
        let handler = Arc::new(handler);

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "TCP server starting");
        }

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, permit)) => {
                        let guard = self.tracker.track(socket.id());
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            let _permit = permit;
                            let _guard = guard;
                            handler.handle(socket).await;
                        });
                    }
                    Err(ListenerError::LimiterClosed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);

        let timeout = Duration::from_secs(self.config.shutdown.drain_timeout_secs);
        let outcome = self.tracker.wait_for_idle(timeout).await;
        match outcome {
            DrainOutcome::Drained => tracing::info!("TCP server stopped"),
            DrainOutcome::TimedOut { remaining } => tracing::warn!(
                remaining,
                timeout_secs = timeout.as_secs(),
                "Drain timed out with connections still open"
            ),
        }
        outcome
    }

    /// Number of connections currently being handled.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }
}
