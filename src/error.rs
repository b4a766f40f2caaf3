//! Error types for registry lookups.

use thiserror::Error;

/// Errors returned by [`crate::registry::Registry::call`].
///
/// Operation failures never appear here: they are counted by the breaker and
/// stay with the caller's closure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    /// No command is registered under this name.
    #[error("command not found: {0}")]
    CommandNotFound(String),
}

/// Result type for registry operations.
pub type BreakerResult<T> = Result<T, BreakerError>;
