//! Connection handlers.
//!
//! A handler receives each accepted socket and owns it until the
//! connection is done. Any `Fn(TcpSocket) -> impl Future` closure is a
//! handler.

use std::future::Future;
use tokio::sync::broadcast;

use crate::lifecycle::Shutdown;
use crate::net::socket::TcpSocket;

/// Per-connection callback invoked by the server for every accepted socket.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle(&self, socket: TcpSocket) -> impl Future<Output = ()> + Send;
}

impl<F, Fut> ConnectionHandler for F
where
    F: Fn(TcpSocket) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, socket: TcpSocket) -> impl Future<Output = ()> + Send {
        self(socket)
    }
}

/// Writes back everything it reads until the peer closes.
///
/// Built with [`EchoHandler::with_shutdown`], it also closes idle
/// connections as soon as shutdown is triggered instead of holding the
/// drain until its timeout.
#[derive(Debug, Clone, Default)]
pub struct EchoHandler {
    shutdown: Option<Shutdown>,
}

impl EchoHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo handler that stops reading once `shutdown` fires.
    pub fn with_shutdown(shutdown: &Shutdown) -> Self {
        Self {
            shutdown: Some(shutdown.clone()),
        }
    }
}

impl ConnectionHandler for EchoHandler {
    async fn handle(&self, mut socket: TcpSocket) {
        let id = socket.id();

        // Subscribe before checking the flag so a trigger in between is not lost.
        let mut stop = self.shutdown.as_ref().map(Shutdown::subscribe);
        let already_stopping = self.shutdown.as_ref().is_some_and(Shutdown::is_triggered);

        while socket.is_alive() && !already_stopping {
            let data = tokio::select! {
                res = socket.read() => match res {
                    Ok([]) => break,
                    Ok(data) => data.to_vec(),
                    Err(e) => {
                        tracing::warn!(connection_id = %id, error = %e, "Read failed");
                        break;
                    }
                },
                _ = shutdown_requested(&mut stop) => {
                    tracing::debug!(connection_id = %id, "Closing connection for shutdown");
                    break;
                }
            };

            if let Err(e) = socket.write_all(&data).await {
                tracing::warn!(connection_id = %id, error = %e, "Echo write failed");
                break;
            }
        }

        if let Err(e) = socket.close().await {
            tracing::debug!(connection_id = %id, error = %e, "Close failed");
        }
    }
}

/// Resolve when shutdown fires; never resolves without a receiver.
async fn shutdown_requested(stop: &mut Option<broadcast::Receiver<()>>) {
    match stop {
        Some(rx) => {
            let _ = rx.recv().await;
        }
        None => std::future::pending().await,
    }
}
