//! OS signal handling.

use std::sync::Arc;

use crate::lifecycle::shutdown::Shutdown;

/// Wait for Ctrl+C, then trigger shutdown.
pub async fn shutdown_on_ctrl_c(shutdown: Arc<Shutdown>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
    shutdown.trigger();
}
