//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections and wrap them as `TcpSocket`s
//! - Enforce max_connections limit via semaphore

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::{ListenerConfig, SocketConfig};
use crate::net::socket::TcpSocket;
use crate::observability::metrics;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address could not be parsed.
    #[error("Invalid bind address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[source] std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    /// The connection limiter was shut down.
    #[error("Connection limiter closed")]
    LimiterClosed,
}

/// A bounded TCP listener that limits concurrent connections.
///
/// When `max_connections` sockets are live, `accept` waits until one of
/// their permits is dropped.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
    socket_config: SocketConfig,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig, socket_config: &SocketConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::InvalidAddress {
                address: config.bind_address.clone(),
                source,
            })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        Ok(Self::from_tokio(listener, config.max_connections, socket_config.clone()))
    }

    /// Wrap an already bound tokio listener.
    pub fn from_tokio(inner: TcpListener, max_connections: usize, socket_config: SocketConfig) -> Self {
        if let Ok(local_addr) = inner.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                "Listener bound"
            );
        }

        Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            socket_config,
        }
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the socket and a permit that must be held for the
    /// connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpSocket, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::LimiterClosed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        if self.socket_config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!(peer_addr = %addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let socket = TcpSocket::with_buffer_size(stream, self.socket_config.read_buffer_size);
        metrics::record_connection_accepted();

        tracing::debug!(
            connection_id = %socket.id(),
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((socket, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the slot is released back to the listener, even if the
/// connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn bind_rejects_bad_address() {
        let config = ListenerConfig {
            bind_address: "not-an-address".to_string(),
            max_connections: 1,
        };
        let err = Listener::bind(&config, &SocketConfig::default()).await.err().unwrap();
        assert!(matches!(err, ListenerError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn accept_wraps_stream_and_holds_permit() {
        let config = ListenerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_connections: 2,
        };
        let socket_config = SocketConfig {
            read_buffer_size: 64,
            nodelay: true,
        };
        let listener = Listener::bind(&config, &socket_config).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (socket, permit) = listener.accept().await.unwrap();

        assert!(socket.is_alive());
        assert_eq!(socket.read_buffer_capacity(), 64);
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
        assert_eq!(listener.max_connections(), 2);
    }
}
