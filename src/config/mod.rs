//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! breaker.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BreakerConfig
//!     → Registry::reconcile (register new or changed commands)
//!
//! On file change (watcher.rs):
//!     → loader.rs → validation.rs
//!     → Registry::reconcile (changed commands are re-registered)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - An invalid reload is logged and ignored
//! - File-driven commands carry no fallback; attach one with `Registry::register`

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BreakerConfig, CommandEntry, ObservabilityConfig};
pub use validation::ValidationError;
