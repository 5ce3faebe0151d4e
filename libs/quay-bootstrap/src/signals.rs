//! Shutdown signal handling.

use anyhow::{Context, Result};
use tokio::signal;

/// Wait until the process receives Ctrl+C or, on unix, SIGTERM.
pub async fn wait_for_shutdown() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .context("failed to install ctrl+c handler")
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install sigterm handler")?;
        sigterm.recv().await;
        anyhow::Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            tracing::info!(signal = "ctrl_c", "shutdown signal received");
        }
        result = terminate => {
            result?;
            tracing::info!(signal = "sigterm", "shutdown signal received");
        }
    }

    Ok(())
}
