//! Process lifecycle helpers for the binary.
//!
//! ```text
//! SIGINT / Ctrl-C → signals.rs → Registry::shutdown (cancel probers) → exit
//! ```

pub mod signals;
