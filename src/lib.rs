//! serverpp: a small TCP server library.
//!
//! [`net::TcpSocket`] wraps an accepted tokio stream with an explicit
//! open/closed state and a fixed-size read buffer. [`server::TcpServer`]
//! accepts connections and hands each socket to a
//! [`server::ConnectionHandler`].

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use net::{SocketError, TcpSocket};
pub use server::{ConnectionHandler, TcpServer};
