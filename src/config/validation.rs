//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Command names present and unique
//! - Thresholds and durations non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before a config is accepted, at startup and on reload

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::BreakerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("command #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("command '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("command '{0}': failure_threshold must be greater than 0")]
    ZeroThreshold(String),

    #[error("command '{0}': window_ms must be greater than 0")]
    ZeroWindow(String),

    #[error("command '{0}': probe_interval_ms must be greater than 0")]
    ZeroProbeInterval(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, entry) in config.commands.iter().enumerate() {
        if entry.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { index });
            continue;
        }
        if !seen.insert(entry.name.as_str()) {
            errors.push(ValidationError::DuplicateName(entry.name.clone()));
        }
        if entry.failure_threshold == 0 {
            errors.push(ValidationError::ZeroThreshold(entry.name.clone()));
        }
        if entry.window_ms == 0 {
            errors.push(ValidationError::ZeroWindow(entry.name.clone()));
        }
        if entry.probe_interval_ms == 0 {
            errors.push(ValidationError::ZeroProbeInterval(entry.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
