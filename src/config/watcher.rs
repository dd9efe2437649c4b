//! Configuration file watcher for hot reload.
//!
//! notify's callback only signals that something happened; a tokio task
//! debounces the burst of events an editor produces on save, reloads the
//! file, re-applies command-line overrides and forwards the result only if
//! it validates and actually differs from what is running.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ServerConfig;
use crate::config::validation::validate_config;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Quiet period after the last file event before reloading.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Adjustments applied to every reloaded file, e.g. command-line flags.
pub type Overrides = Box<dyn Fn(&mut ServerConfig) + Send + Sync>;

/// Decides whether a reloaded configuration should replace the running one.
#[derive(Debug)]
pub struct ReloadGate {
    current: ServerConfig,
}

impl ReloadGate {
    pub fn new(current: ServerConfig) -> Self {
        Self { current }
    }

    /// `Ok(None)` when nothing changed, the candidate otherwise. A candidate
    /// that fails validation leaves the running configuration in place.
    pub fn admit(&mut self, candidate: ServerConfig) -> Result<Option<ServerConfig>, ConfigError> {
        validate_config(&candidate).map_err(ConfigError::Validation)?;
        if candidate == self.current {
            return Ok(None);
        }
        self.current = candidate.clone();
        Ok(Some(candidate))
    }
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    gate: ReloadGate,
    overrides: Overrides,
    update_tx: mpsc::UnboundedSender<ServerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated, changed
    /// configurations. `current` is the configuration already running.
    pub fn new(
        path: &Path,
        current: ServerConfig,
        overrides: Overrides,
    ) -> (Self, mpsc::UnboundedReceiver<ServerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                gate: ReloadGate::new(current),
                overrides,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Must be called inside a tokio runtime. The returned
    /// handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        tokio::spawn(self.reload_loop(event_rx));
        Ok(watcher)
    }

    async fn reload_loop(mut self, mut events: mpsc::UnboundedReceiver<()>) {
        while events.recv().await.is_some() {
            tokio::time::sleep(DEBOUNCE).await;
            while events.try_recv().is_ok() {}

            let mut candidate = match load_config(&self.path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                    continue;
                }
            };
            (self.overrides)(&mut candidate);

            match self.gate.admit(candidate) {
                Ok(Some(config)) => {
                    if self.update_tx.send(config).is_err() {
                        break;
                    }
                }
                Ok(None) => tracing::debug!("Config file touched without changes"),
                Err(e) => {
                    tracing::error!("Reloaded config rejected: {}. Keeping current configuration.", e);
                }
            }
        }
    }
}
