//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown. Non-unix targets
//! only listen for ctrl-c.

/// Resolve once a termination signal arrives.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                tracing::info!("Received SIGINT");
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received ctrl-c");
    }

    Ok(())
}
