//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → socket.rs (TcpSocket: liveness, write, read, close)
//!     → connection.rs (ids, state, live-connection tracking)
//!     → handed to the server's connection handler
//!
//! Socket States:
//!     Active → Closed
//! ```

pub mod connection;
pub mod listener;
pub mod socket;

pub use connection::{ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use socket::{SocketError, TcpSocket, DEFAULT_READ_BUFFER_SIZE};
