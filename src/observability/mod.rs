//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! breaker, prober, registry, config watcher
//!     → tracing events with structured fields (command, failed, threshold)
//!     → logging.rs subscriber (EnvFilter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Transition events (opened, closed, probe failed) log at info/warn
//! - Per-call events (rejections, window refresh) log at debug

pub mod logging;
