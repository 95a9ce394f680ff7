//! Topology hot reload.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::TopologyConfig;
use crate::observability::metrics;
use crate::routing::Router;

/// Apply topology updates to the router until shutdown or the sender is dropped.
///
/// Returns the number of updates applied.
pub async fn run_reload_loop(
    router: Arc<Router>,
    mut updates: mpsc::UnboundedReceiver<TopologyConfig>,
    mut shutdown: broadcast::Receiver<()>,
) -> usize {
    let mut applied = 0;

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else {
                    tracing::debug!("Topology update channel closed");
                    break;
                };
                match router.apply_config(&config) {
                    Ok(()) => {
                        applied += 1;
                        metrics::record_config_reload(true);
                    }
                    Err(e) => {
                        metrics::record_config_reload(false);
                        tracing::error!(error = %e, "Rejected topology update, keeping current table");
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Reload loop received shutdown signal, exiting");
                break;
            }
        }
    }

    applied
}
