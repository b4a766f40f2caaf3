//! Command circuit breaker.
//!
//! Wraps calls to unreliable operations by name. Once failures in the counting
//! window reach a command's threshold the circuit opens and calls are rejected;
//! a background prober then lets exactly one trial call through per interval
//! until one succeeds and the circuit closes again.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use circuit_breaker::{CommandConfig, Registry};
//!
//! let registry = Registry::new();
//! registry.register(
//!     "inventory",
//!     CommandConfig::new(5, Duration::from_secs(60), Duration::from_secs(10))
//!         .with_fallback(|| tracing::warn!("inventory unavailable")),
//! );
//!
//! let admitted = registry
//!     .execute("inventory", || async { fetch_inventory().await })
//!     .await;
//! ```

pub mod breaker;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod registry;

pub use breaker::{Admission, CircuitStatus, Command, CommandConfig, CommandSnapshot};
pub use config::BreakerConfig;
pub use error::BreakerError;
pub use registry::Registry;
