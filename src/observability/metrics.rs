//! Metrics collection and exposition.
//!
//! # Metrics
//! - `serverpp_connections_accepted_total` (counter)
//! - `serverpp_active_connections` (gauge)
//! - `serverpp_bytes_written_total` (counter)
//! - `serverpp_bytes_read_total` (counter)
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const CONNECTIONS_ACCEPTED: &str = "serverpp_connections_accepted_total";
pub const ACTIVE_CONNECTIONS: &str = "serverpp_active_connections";
pub const BYTES_WRITTEN: &str = "serverpp_bytes_written_total";
pub const BYTES_READ: &str = "serverpp_bytes_read_total";

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(CONNECTIONS_ACCEPTED, "Total accepted TCP connections");
    describe_gauge!(ACTIVE_CONNECTIONS, "Currently open TCP connections");
    describe_counter!(BYTES_WRITTEN, "Bytes written to sockets");
    describe_counter!(BYTES_READ, "Bytes read from sockets");

    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_connection_accepted() {
    counter!(CONNECTIONS_ACCEPTED).increment(1);
}

pub fn record_active_connections(count: u64) {
    gauge!(ACTIVE_CONNECTIONS).set(count as f64);
}

pub fn record_bytes_written(bytes: usize) {
    counter!(BYTES_WRITTEN).increment(bytes as u64);
}

pub fn record_bytes_read(bytes: usize) {
    counter!(BYTES_READ).increment(bytes as u64);
}
