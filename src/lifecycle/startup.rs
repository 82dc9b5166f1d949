//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve until a termination signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::lifecycle::{signals, Shutdown};
use crate::net::connection::DrainOutcome;
use crate::net::listener::ListenerError;
use crate::observability::metrics;
use crate::server::{EchoHandler, TcpServer};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

/// Run the echo server with `config` until SIGINT/SIGTERM.
pub async fn run(config: ServerConfig) -> Result<DrainOutcome, StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let server = TcpServer::new(config);
    let listener = server.bind().await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let serve = server.run(listener, EchoHandler::with_shutdown(&shutdown), server_shutdown);
    tokio::pin!(serve);

    tokio::select! {
        outcome = &mut serve => return Ok(outcome),
        res = signals::wait_for_signal() => res?,
    }

    shutdown.trigger();
    Ok(serve.await)
}
