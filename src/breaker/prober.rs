//! Recovery prober.
//!
//! Runs while a command is open. On every interval tick it offers one probe
//! ticket, waits for the call that claimed it to report, then either closes
//! the circuit or keeps ticking.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::breaker::command::Command;
use crate::breaker::status::{ProbeOutcome, ProbeReport};

/// Cancellation handle for a running prober.
#[derive(Debug)]
pub(crate) struct ProberHandle {
    cancel: broadcast::Sender<()>,
}

impl ProberHandle {
    /// Stop the prober at its next wait point.
    pub(crate) fn cancel(self) {
        let _ = self.cancel.send(());
    }
}

/// Start a prober for `command`. The caller stores the returned handle in
/// the command state under the same lock that set the status to open.
///
/// The task only holds a weak reference; once the command is dropped the
/// handle goes with it and the task exits.
pub(crate) fn spawn(command: &Arc<Command>) -> ProberHandle {
    let (cancel, cancelled) = broadcast::channel(1);
    tokio::spawn(run(Arc::downgrade(command), cancelled));
    ProberHandle { cancel }
}

/// First tick one period from now, or roughly thirty years out if that
/// overflows the clock.
fn first_tick(period: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(period)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

async fn run(command: Weak<Command>, mut cancelled: broadcast::Receiver<()>) {
    let Some((name, period)) = command
        .upgrade()
        .map(|c| (c.name().to_string(), c.probe_interval()))
    else {
        return;
    };
    let mut ticker = time::interval_at(first_tick(period), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        command = %name,
        interval_ms = period.as_millis() as u64,
        "Recovery prober started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancelled.recv() => {
                tracing::debug!(command = %name, "Recovery prober stopped");
                return;
            }
        }

        let (ticket, report) = oneshot::channel::<ProbeReport>();
        match command.upgrade() {
            Some(command) => command.offer_probe(ticket),
            None => return,
        }
        tracing::debug!(command = %name, "Probe ticket offered");

        let report = tokio::select! {
            report = report => report,
            _ = cancelled.recv() => {
                tracing::debug!(
                    command = %name,
                    "Recovery prober stopped while awaiting a report"
                );
                return;
            }
        };

        match report {
            Ok(ProbeReport { outcome: ProbeOutcome::Success, applied }) => {
                if let Some(command) = command.upgrade() {
                    command.close_after_probe();
                }
                let _ = applied.send(());
                return;
            }
            Ok(ProbeReport { outcome: ProbeOutcome::Failure, applied }) => {
                tracing::warn!(command = %name, "Probe failed, circuit stays open");
                let _ = applied.send(());
            }
            Err(_) => {
                // Claimant dropped before reporting; also covers retirement,
                // which discards the unclaimed ticket.
                tracing::warn!(command = %name, "Probe abandoned before reporting");
            }
        }
    }
}
