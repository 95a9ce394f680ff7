//! Configuration file watcher for hot reload.
//!
//! A reloaded topology must declare at least one exchange. Editors that
//! truncate before writing produce a change event on an empty file, which
//! would otherwise replace the live table with nothing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::TopologyConfig;
use crate::observability::metrics;

/// A watcher that monitors the topology file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<TopologyConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<TopologyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned handle must be kept alive for as long as events are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Topology file change detected, reloading");
                        match reload(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                metrics::record_config_reload(false);
                                tracing::error!(error = %e, "Failed to reload topology, keeping current table");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Topology watcher started");
        Ok(watcher)
    }
}

/// Load a changed topology file for hot reload.
pub fn reload(path: &Path) -> Result<TopologyConfig, ConfigError> {
    let config = load_config(path)?;
    if config.exchanges.is_empty() {
        return Err(ConfigError::EmptyTopology);
    }
    Ok(config)
}
