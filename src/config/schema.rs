//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::breaker::CommandConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Commands to register at startup.
    pub commands: Vec<CommandEntry>,
}

impl BreakerConfig {
    /// Find a command entry by name.
    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.iter().find(|entry| entry.name == name)
    }
}

/// One protected command.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandEntry {
    /// Name used at call sites.
    pub name: String,

    /// Failures within one window that open the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Counting window in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Delay between recovery probes in milliseconds.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_probe_interval_ms() -> u64 {
    10_000
}

impl CommandEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure_threshold: default_failure_threshold(),
            window_ms: default_window_ms(),
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

impl From<&CommandEntry> for CommandConfig {
    fn from(entry: &CommandEntry) -> Self {
        CommandConfig::new(
            entry.failure_threshold,
            Duration::from_millis(entry.window_ms),
            Duration::from_millis(entry.probe_interval_ms),
        )
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Use ANSI colours in log output.
    pub ansi: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: true,
        }
    }
}
