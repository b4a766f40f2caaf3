//! Name-keyed command registry.
//!
//! # Responsibilities
//! - Register (or replace) commands by name
//! - Route guarded calls to the right command
//! - Reconcile registrations with a loaded configuration
//! - Cancel every prober on shutdown
//!
//! # Design Decisions
//! - Explicit instances are passed to call sites; `Registry::global` is an
//!   opt-in process-wide default
//! - Re-registration retires the previous command and cancels its prober
//! - Entries are never removed, only replaced

use std::future::Future;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::breaker::{Admission, Command, CommandConfig, CommandSnapshot};
use crate::config::BreakerConfig;
use crate::error::{BreakerError, BreakerResult};

/// Registry of protected commands.
#[derive(Debug, Default)]
pub struct Registry {
    commands: DashMap<String, Arc<Command>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared process-wide registry, created on first use.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Install a command under `name`, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, config: CommandConfig) -> Arc<Command> {
        let name = name.into();
        let command = Arc::new(Command::new(name.clone(), config));

        match self.commands.insert(name.clone(), Arc::clone(&command)) {
            Some(previous) => {
                previous.retire();
                tracing::info!(command = %name, "Command re-registered, previous instance retired");
            }
            None => {
                tracing::info!(
                    command = %name,
                    threshold = command.failure_threshold(),
                    window_ms = command.window().as_millis() as u64,
                    probe_interval_ms = command.probe_interval().as_millis() as u64,
                    "Command registered"
                );
            }
        }

        command
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Run `operation` through the named command's breaker.
    pub async fn call<F, Fut, T, E>(&self, name: &str, operation: F) -> BreakerResult<Admission>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let command = self
            .get(name)
            .ok_or_else(|| BreakerError::CommandNotFound(name.to_string()))?;
        Ok(command.call(operation).await)
    }

    /// Run `operation` through the named command's breaker and report whether
    /// the call was admitted as a normal call.
    ///
    /// `true` means the breaker let the call through, whatever the operation
    /// returned. Rejections, probe calls and unknown names give `false`.
    pub async fn execute<F, Fut, T, E>(&self, name: &str, operation: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.call(name, operation).await {
            Ok(admission) => admission.is_admitted(),
            Err(e) => {
                tracing::warn!(command = %name, error = %e, "Command not found");
                false
            }
        }
    }

    /// Register every command in `config` that is new or whose settings
    /// changed. Returns how many were (re-)registered.
    pub fn reconcile(&self, config: &BreakerConfig) -> usize {
        let mut registered = 0;
        for entry in &config.commands {
            let command_config = CommandConfig::from(entry);
            let unchanged = self
                .get(&entry.name)
                .is_some_and(|existing| existing.matches(&command_config));
            if !unchanged {
                self.register(entry.name.clone(), command_config);
                registered += 1;
            }
        }
        registered
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.commands.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshots of every command, sorted by name.
    pub fn snapshots(&self) -> Vec<CommandSnapshot> {
        let commands: Vec<Arc<Command>> =
            self.commands.iter().map(|entry| Arc::clone(entry.value())).collect();
        let mut snapshots: Vec<CommandSnapshot> = commands.iter().map(|c| c.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Retire every command, cancelling all active probers.
    pub fn shutdown(&self) {
        let commands: Vec<Arc<Command>> =
            self.commands.iter().map(|entry| Arc::clone(entry.value())).collect();
        for command in commands {
            command.retire();
        }
        tracing::info!(commands = self.commands.len(), "Registry shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::CircuitStatus;
    use crate::config::CommandEntry;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unknown_command_is_not_admitted() {
        let registry = Registry::new();
        let mut ran = false;
        let admitted = registry
            .execute("missing", || {
                ran = true;
                async { Ok::<_, ()>(()) }
            })
            .await;

        assert!(!admitted);
        assert!(!ran);
        assert_eq!(
            registry.call("missing", || async { Ok::<_, ()>(()) }).await,
            Err(BreakerError::CommandNotFound("missing".into()))
        );
    }

    #[test]
    fn test_register_replaces_and_retires() {
        let registry = Registry::new();
        let first = registry.register("db", CommandConfig::default());
        let second = registry.register("db", CommandConfig::default());

        assert_eq!(registry.len(), 1);
        assert!(first.is_retired());
        assert!(!second.is_retired());
        assert!(Arc::ptr_eq(&registry.get("db").unwrap(), &second));
    }

    #[test]
    fn test_reconcile_only_touches_new_or_changed() {
        let registry = Registry::new();
        let mut config = BreakerConfig {
            commands: vec![CommandEntry::new("db"), CommandEntry::new("cache")],
            ..Default::default()
        };
        assert_eq!(registry.reconcile(&config), 2);

        let db = registry.get("db").unwrap();
        let cache = registry.get("cache").unwrap();

        config.commands[1].failure_threshold = 9;
        assert_eq!(registry.reconcile(&config), 1);

        assert!(Arc::ptr_eq(&registry.get("db").unwrap(), &db));
        assert!(cache.is_retired());
        assert_eq!(registry.get("cache").unwrap().failure_threshold(), 9);
    }

    #[test]
    fn test_names_and_snapshots_sorted() {
        let registry = Registry::new();
        registry.register("b", CommandConfig::default());
        registry.register("a", CommandConfig::default());

        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
        let snapshots = registry.snapshots();
        assert_eq!(snapshots[0].name, "a");
        assert_eq!(snapshots[1].status, CircuitStatus::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_retires_everything() {
        let registry = Registry::new();
        registry.register(
            "db",
            CommandConfig::new(1, Duration::from_secs(60), Duration::from_secs(1)),
        );
        registry.execute("db", || async { Err::<(), _>("down") }).await;

        registry.shutdown();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let snapshot = &registry.snapshots()[0];
        assert_eq!(snapshot.status, CircuitStatus::Open);
        assert!(!snapshot.probe_pending);
        assert!(!registry.execute("db", || async { Ok::<_, ()>(()) }).await);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
    }
}
