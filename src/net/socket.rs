//! TCP socket wrapper.
//!
//! # Responsibilities
//! - Own an already-connected `TcpStream` handed over by the runtime
//! - Report liveness (open until closed locally)
//! - Write bytes, read into a fixed-size buffer, close
//!
//! # Design Decisions
//! - Tokio streams have no `is_open` query, so the open/closed state is
//!   tracked here and checked before every operation
//! - Only a local `close` ends liveness. A peer end-of-stream is recorded
//!   separately; writing back to a half-closed peer still works
//! - `write` is a single write call; `write_all` loops
//! - I/O errors are surfaced unchanged inside `SocketError::Io`

use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::net::connection::{ConnectionId, ConnectionState};
use crate::observability::metrics;

/// Size of the read buffer allocated for every socket.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Errors that can occur on socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// The socket was closed before the operation.
    #[error("socket {0} is closed")]
    Closed(ConnectionId),

    /// The underlying stream failed.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A connected TCP socket with an explicit open/closed state.
#[derive(Debug)]
pub struct TcpSocket {
    stream: TcpStream,
    read_buffer: Vec<u8>,
    state: ConnectionState,
    peer_closed: bool,
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
}

impl TcpSocket {
    /// Wrap an already-connected stream with the default read buffer.
    pub fn new(stream: TcpStream) -> Self {
        Self::with_buffer_size(stream, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Wrap an already-connected stream with a read buffer of `size` bytes.
    pub fn with_buffer_size(stream: TcpStream, size: usize) -> Self {
        let peer_addr = stream.peer_addr().ok();
        let id = ConnectionId::new();

        tracing::trace!(connection_id = %id, peer_addr = ?peer_addr, buffer = size, "Socket wrapped");

        Self {
            stream,
            read_buffer: vec![0; size.max(1)],
            state: ConnectionState::Active,
            peer_closed: false,
            id,
            peer_addr,
        }
    }

    /// Whether the socket is still open, i.e. `close` has not been called.
    pub fn is_alive(&self) -> bool {
        self.state.is_active()
    }

    /// Write `data` with a single write call.
    ///
    /// Returns the number of bytes the OS accepted, which may be less than
    /// `data.len()`.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, SocketError> {
        self.ensure_alive()?;
        if data.is_empty() {
            return Ok(0);
        }

        let written = self.stream.write(data).await?;
        metrics::record_bytes_written(written);

        tracing::trace!(connection_id = %self.id, bytes = written, requested = data.len(), "Socket write");
        Ok(written)
    }

    /// Write the whole of `data`.
    ///
    /// Bytes are counted as each chunk is accepted, so a failure partway
    /// through still accounts for what was sent.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), SocketError> {
        self.ensure_alive()?;

        let mut remaining = data;
        while !remaining.is_empty() {
            let n = self.stream.write(remaining).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            metrics::record_bytes_written(n);
            remaining = &remaining[n..];
        }

        tracing::trace!(connection_id = %self.id, bytes = data.len(), "Socket write_all");
        Ok(())
    }

    /// Read once into the internal buffer and return the filled part.
    ///
    /// An empty slice means the peer ended its side of the stream. The socket
    /// stays alive for writing; later reads return an empty slice without
    /// touching the stream.
    pub async fn read(&mut self) -> Result<&[u8], SocketError> {
        self.ensure_alive()?;
        if self.peer_closed {
            return Ok(&[]);
        }

        let n = self.stream.read(&mut self.read_buffer).await?;
        if n == 0 {
            tracing::debug!(connection_id = %self.id, "Peer closed its side of the stream");
            self.peer_closed = true;
        } else {
            metrics::record_bytes_read(n);
        }

        Ok(&self.read_buffer[..n])
    }

    /// Close the socket. The peer observes end-of-stream.
    ///
    /// Closing an already closed socket does nothing.
    pub async fn close(&mut self) -> Result<(), SocketError> {
        if !self.is_alive() {
            return Ok(());
        }
        self.state = ConnectionState::Closed;

        match self.stream.shutdown().await {
            Ok(()) => {
                tracing::debug!(connection_id = %self.id, "Socket closed");
                Ok(())
            }
            Err(e) if is_disconnect(&e) => {
                tracing::debug!(connection_id = %self.id, error = %e, "Socket already disconnected");
                Ok(())
            }
            Err(e) => Err(SocketError::Io(e)),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a read has seen the peer's end-of-stream.
    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Remote address captured when the socket was wrapped.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn read_buffer_capacity(&self) -> usize {
        self.read_buffer.len()
    }

    fn ensure_alive(&self) -> Result<(), SocketError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(SocketError::Closed(self.id))
        }
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::NotConnected | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
    )
}
