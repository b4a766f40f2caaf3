//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Reload and validate the file on change
//! - Forward a reload only when some command was added or changed
//!
//! # Design Decisions
//! - Commands dropped from the file are reported but stay registered
//! - An invalid file is logged and the previous config is kept

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::BreakerConfig;

/// Names of commands in `new` that are absent from `old` or whose settings differ.
pub fn changed_commands(old: &BreakerConfig, new: &BreakerConfig) -> Vec<String> {
    new.commands
        .iter()
        .filter(|entry| old.command(&entry.name) != Some(*entry))
        .map(|entry| entry.name.clone())
        .collect()
}

/// Reload bookkeeping owned by the notify callback.
struct Reloader {
    path: PathBuf,
    current: BreakerConfig,
    update_tx: mpsc::UnboundedSender<BreakerConfig>,
}

impl Reloader {
    /// Load the file and forward it if any command changed. Returns whether
    /// an update was sent.
    fn reload(&mut self) -> bool {
        let new_config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current commands");
                return false;
            }
        };

        let changed = changed_commands(&self.current, &new_config);
        let dropped: Vec<&str> = self
            .current
            .commands
            .iter()
            .filter(|entry| new_config.command(&entry.name).is_none())
            .map(|entry| entry.name.as_str())
            .collect();
        if !dropped.is_empty() {
            tracing::warn!(commands = ?dropped, "Commands removed from config stay registered");
        }

        if changed.is_empty() {
            tracing::debug!(path = ?self.path, "Config touched, no command changed");
            return false;
        }

        tracing::info!(path = ?self.path, commands = ?changed, "Config change detected");
        self.current = new_config.clone();
        self.update_tx.send(new_config).is_ok()
    }
}

/// Watches the configuration file and sends reloads that change commands.
pub struct ConfigWatcher {
    reloader: Reloader,
}

impl ConfigWatcher {
    /// `current` is the config already applied. Returns the watcher and a
    /// receiver for configuration updates.
    pub fn new(
        path: &Path,
        current: BreakerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<BreakerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                reloader: Reloader {
                    path: path.to_path_buf(),
                    current,
                    update_tx,
                },
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.reloader.path.clone();
        let mut reloader = self.reloader;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reloader.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
