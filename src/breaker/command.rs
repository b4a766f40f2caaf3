//! Per-command breaker state.
//!
//! # Responsibilities
//! - Hold the failure counter, threshold, counting window and status
//! - Refresh the counter when the window has elapsed
//! - Own the probe ticket and the prober handle while open
//!
//! # Design Decisions
//! - The failure counter is a lock-free atomic; status, window start and the
//!   probe ticket live behind one mutex
//! - The mutex is never held across an `.await` or while user code runs

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::breaker::prober::ProberHandle;
use crate::breaker::status::{CircuitStatus, ProbeTicket};

/// Shortest probe interval a command accepts.
const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(1);

/// Callback run in place of the operation when a call is rejected.
pub type Fallback = Arc<dyn Fn() + Send + Sync>;

/// Settings a command is registered with. Fixed for the command's lifetime.
#[derive(Clone)]
pub struct CommandConfig {
    /// Failures within one window that open the circuit. Zero behaves as one.
    pub failure_threshold: u32,
    /// Counting window; the failure counter resets once it has elapsed.
    pub window: Duration,
    /// Delay between recovery probes while open.
    pub probe_interval: Duration,
    /// Invoked on every rejected call.
    pub fallback: Option<Fallback>,
}

impl CommandConfig {
    pub fn new(failure_threshold: u32, window: Duration, probe_interval: Duration) -> Self {
        Self {
            failure_threshold,
            window,
            probe_interval,
            fallback: None,
        }
    }

    /// Attach a fallback invoked whenever the open circuit rejects a call.
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60), Duration::from_secs(10))
    }
}

impl std::fmt::Debug for CommandConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("window", &self.window)
            .field("probe_interval", &self.probe_interval)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Point-in-time view of a command, for inspection and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSnapshot {
    pub name: String,
    pub status: CircuitStatus,
    pub failed_count: u32,
    pub failure_threshold: u32,
    /// A probe ticket is on offer and no call has claimed it yet.
    pub probe_pending: bool,
}

/// Mutable state guarded by the command lock.
pub(crate) struct CommandState {
    pub status: CircuitStatus,
    pub window_start: Instant,
    pub probe_ticket: Option<ProbeTicket>,
    pub prober: Option<ProberHandle>,
    /// Replaced by re-registration or shut down; rejects every call.
    pub retired: bool,
}

impl CommandState {
    fn refresh_due(&self, window: Duration) -> bool {
        match self.window_start.checked_add(window) {
            Some(window_end) => Instant::now() > window_end,
            None => false,
        }
    }
}

/// One protected operation.
pub struct Command {
    name: String,
    failure_threshold: u32,
    window: Duration,
    probe_interval: Duration,
    pub(crate) fallback: Option<Fallback>,
    failed_count: AtomicU32,
    state: Mutex<CommandState>,
}

impl Command {
    /// Create a closed command.
    pub fn new(name: impl Into<String>, config: CommandConfig) -> Self {
        let name = name.into();

        if config.failure_threshold == 0 {
            tracing::warn!(
                command = %name,
                "Failure threshold of 0 configured, circuit will open on the first failure"
            );
        }
        if config.probe_interval < MIN_PROBE_INTERVAL {
            tracing::warn!(
                command = %name,
                probe_interval_ms = config.probe_interval.as_millis() as u64,
                "Probe interval too short, using 1ms"
            );
        }

        Self {
            name,
            failure_threshold: config.failure_threshold.max(1),
            window: config.window,
            probe_interval: config.probe_interval.max(MIN_PROBE_INTERVAL),
            fallback: config.fallback,
            failed_count: AtomicU32::new(0),
            state: Mutex::new(CommandState {
                status: CircuitStatus::Closed,
                window_start: Instant::now(),
                probe_ticket: None,
                prober: None,
                retired: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective threshold (never below one).
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn probe_interval(&self) -> Duration {
        self.probe_interval
    }

    pub fn status(&self) -> CircuitStatus {
        self.lock().status
    }

    /// Failures counted in the current window.
    pub fn current_failure_count(&self) -> u32 {
        self.failed_count.load(Ordering::Acquire)
    }

    /// Reset the failure counter and start a new counting window.
    pub fn refresh(&self) {
        let mut state = self.lock();
        self.refresh_locked(&mut state);
    }

    /// True once the current counting window has elapsed.
    pub fn is_refresh_due(&self) -> bool {
        self.lock().refresh_due(self.window)
    }

    /// True if the command was replaced or shut down.
    pub fn is_retired(&self) -> bool {
        self.lock().retired
    }

    pub fn snapshot(&self) -> CommandSnapshot {
        let state = self.lock();
        CommandSnapshot {
            name: self.name.clone(),
            status: state.status,
            failed_count: self.current_failure_count(),
            failure_threshold: self.failure_threshold,
            probe_pending: state.probe_ticket.is_some(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CommandState> {
        self.state.lock().expect("command state mutex poisoned")
    }

    /// Refresh the window if it has elapsed. Caller holds the lock.
    pub(crate) fn refresh_if_due(&self, state: &mut CommandState) {
        if state.refresh_due(self.window) {
            tracing::debug!(
                command = %self.name,
                forgiven = self.current_failure_count(),
                "Counting window elapsed, failure count refreshed"
            );
            self.refresh_locked(state);
        }
    }

    fn refresh_locked(&self, state: &mut CommandState) {
        state.window_start = Instant::now();
        self.failed_count.store(0, Ordering::Release);
    }

    /// Count one failure, returning the new total.
    pub(crate) fn record_failure(&self) -> u32 {
        self.failed_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Make a probe ticket available to the next caller.
    pub(crate) fn offer_probe(&self, ticket: ProbeTicket) {
        let mut state = self.lock();
        if state.retired {
            return;
        }
        state.probe_ticket = Some(ticket);
    }

    /// Close the circuit after a successful probe.
    pub(crate) fn close_after_probe(&self) {
        let mut state = self.lock();
        if state.retired {
            return;
        }
        state.status = CircuitStatus::Closed;
        state.prober = None;
        self.failed_count.store(0, Ordering::Release);
        tracing::info!(command = %self.name, "Circuit closed after successful probe");
    }

    /// Take the command out of service: cancel its prober and reject all
    /// further calls.
    pub(crate) fn retire(&self) {
        let mut state = self.lock();
        state.retired = true;
        state.status = CircuitStatus::Open;
        state.probe_ticket = None;
        if let Some(prober) = state.prober.take() {
            prober.cancel();
            tracing::debug!(command = %self.name, "Recovery prober cancelled");
        }
    }

    /// True if `config` would produce a command with the same settings.
    pub(crate) fn matches(&self, config: &CommandConfig) -> bool {
        self.failure_threshold == config.failure_threshold.max(1)
            && self.window == config.window
            && self.probe_interval == config.probe_interval.max(MIN_PROBE_INTERVAL)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("failure_threshold", &self.failure_threshold)
            .field("failed_count", &self.current_failure_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_command_starts_closed() {
        let command = Command::new("db", CommandConfig::default());
        assert_eq!(command.status(), CircuitStatus::Closed);
        assert_eq!(command.current_failure_count(), 0);
        assert!(!command.is_retired());
    }

    #[test]
    fn test_zero_threshold_behaves_as_one() {
        let config = CommandConfig::new(0, Duration::from_secs(60), Duration::from_secs(1));
        let command = Command::new("db", config.clone());
        assert_eq!(command.failure_threshold(), 1);
        assert!(command.matches(&config));
    }

    #[test]
    fn test_refresh_resets_counter() {
        let command = Command::new("db", CommandConfig::default());
        command.record_failure();
        command.record_failure();
        assert_eq!(command.current_failure_count(), 2);

        command.refresh();
        assert_eq!(command.current_failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_due_after_window() {
        let config = CommandConfig::new(5, Duration::from_secs(3), Duration::from_secs(1));
        let command = Command::new("db", config);
        assert!(!command.is_refresh_due());

        tokio::time::advance(Duration::from_secs(3)).await;
        // Due only once the window is strictly exceeded.
        assert!(!command.is_refresh_due());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(command.is_refresh_due());

        command.refresh();
        assert!(!command.is_refresh_due());
    }

    #[test]
    fn test_retire_rejects_and_snapshots_open() {
        let command = Command::new("db", CommandConfig::default());
        command.retire();

        let snapshot = command.snapshot();
        assert_eq!(snapshot.status, CircuitStatus::Open);
        assert!(!snapshot.probe_pending);
        assert!(command.is_retired());
    }

    #[test]
    fn test_matches_ignores_fallback() {
        let config = CommandConfig::new(3, Duration::from_secs(10), Duration::from_secs(2));
        let command = Command::new("db", config.clone().with_fallback(|| {}));
        assert!(command.matches(&config));
        let stricter = CommandConfig::new(4, Duration::from_secs(10), Duration::from_secs(2));
        assert!(!command.matches(&stricter));
    }
}
