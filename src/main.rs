//! serverpp echo server.
//!
//! Accepts TCP connections and echoes back whatever each peer sends, until
//! SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;

use serverpp::config::{load_config, validation::validate_config, ConfigError, ServerConfig};
use serverpp::lifecycle::startup;
use serverpp::net::connection::DrainOutcome;
use serverpp::observability::logging;

#[derive(Parser)]
#[command(name = "serverpp")]
#[command(about = "TCP echo server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        read_buffer_size = config.socket.read_buffer_size,
        "Configuration loaded"
    );

    match startup::run(config).await? {
        DrainOutcome::Drained => tracing::info!("Shutdown complete"),
        DrainOutcome::TimedOut { remaining } => {
            tracing::warn!(remaining, "Shutdown complete, connections abandoned")
        }
    }
    Ok(())
}
