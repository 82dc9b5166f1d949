//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use serverpp::config::{ServerConfig, SocketConfig};
use serverpp::net::{Listener, TcpSocket};
use tokio::net::{TcpListener, TcpStream};

#[allow(dead_code)]
/// Connect a client to a fresh loopback listener and wrap the server side.
pub async fn socket_pair() -> (TcpSocket, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (TcpSocket::new(server), client)
}

/// Config bound to an ephemeral loopback port.
#[allow(dead_code)]
pub fn test_config(max_connections: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.listener.max_connections = max_connections;
    config.shutdown.drain_timeout_secs = 2;
    config
}

/// Bind a listener for `config` and return it with its address.
#[allow(dead_code)]
pub async fn bind(config: &ServerConfig) -> (Listener, SocketAddr) {
    let listener = Listener::bind(&config.listener, &SocketConfig::default()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Bound on how long a test waits for a network event.
#[allow(dead_code)]
pub const WAIT: Duration = Duration::from_secs(5);
