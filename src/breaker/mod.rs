//! Circuit breaker core.
//!
//! # States
//! - Closed: operation runs, failures are counted
//! - Open: calls are rejected, fallback runs instead
//! - Half-open: the one call holding the probe ticket runs the operation
//!
//! # State Transitions
//! ```text
//! Closed → Open: failed_count >= threshold within the counting window
//! Open → Half-open (one call): prober tick offers a ticket, a caller claims it
//! Half-open → Closed: probe succeeds, failed_count reset
//! Half-open → Open: probe fails, prober keeps ticking
//! ```
//!
//! # Design Decisions
//! - Per-command state; one command's failures never touch another's
//! - The prober lives exactly as long as the open period
//! - The counting window refreshes independently of status

pub mod command;
mod guard;
pub(crate) mod prober;
pub mod status;

pub use command::{Command, CommandConfig, CommandSnapshot, Fallback};
pub use status::{Admission, CircuitStatus, ProbeOutcome};
