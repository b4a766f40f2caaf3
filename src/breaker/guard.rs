//! Guarded call protocol.
//!
//! ```text
//! call(operation)
//!     → lock: refresh window if due, claim probe ticket or read status
//!     → open: fallback, reject
//!     → closed / probe: run operation without the lock
//!     → probe: report outcome to the prober, wait until applied
//!     → normal: lock, open the circuit and spawn the prober on threshold
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::breaker::command::Command;
use crate::breaker::prober;
use crate::breaker::status::{Admission, CircuitStatus, ProbeOutcome, ProbeReport, ProbeTicket};

enum Decision {
    Run,
    Probe(ProbeTicket),
    Reject,
}

impl Command {
    /// Run `operation` through the breaker.
    ///
    /// `Err` from the operation counts as a failure. The operation's value is
    /// not returned; capture it inside the closure if needed.
    pub async fn call<F, Fut, T, E>(self: &Arc<Self>, operation: F) -> Admission
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let decision = {
            let mut state = self.lock();
            self.refresh_if_due(&mut state);

            if let Some(ticket) = state.probe_ticket.take() {
                tracing::debug!(command = %self.name(), "Probe ticket claimed");
                Decision::Probe(ticket)
            } else if state.status == CircuitStatus::Open {
                Decision::Reject
            } else {
                Decision::Run
            }
        };

        match decision {
            Decision::Reject => {
                self.reject();
                Admission::Rejected
            }
            Decision::Probe(ticket) => {
                self.probe(ticket, operation).await;
                Admission::Probe
            }
            Decision::Run => {
                self.run(operation).await;
                Admission::Admitted
            }
        }
    }

    fn reject(&self) {
        tracing::debug!(
            command = %self.name(),
            failed = self.current_failure_count(),
            "Circuit open, call rejected"
        );
        if let Some(fallback) = &self.fallback {
            fallback();
        }
    }

    async fn run<F, Fut, T, E>(self: &Arc<Self>, operation: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if operation().await.is_err() {
            let failed = self.record_failure();
            tracing::debug!(command = %self.name(), failed, "Operation failed");
        }

        let mut state = self.lock();
        let failed = self.current_failure_count();
        if failed >= self.failure_threshold() && state.status != CircuitStatus::Open {
            tracing::warn!(
                command = %self.name(),
                failed,
                threshold = self.failure_threshold(),
                "Failure threshold reached, circuit opened"
            );
            state.status = CircuitStatus::Open;
            state.prober = Some(prober::spawn(self));
        }
    }

    async fn probe<F, Fut, T, E>(&self, ticket: ProbeTicket, operation: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = operation().await;
        let outcome = ProbeOutcome::from_result(&result);
        if outcome == ProbeOutcome::Failure {
            self.record_failure();
        }

        let (applied, done) = oneshot::channel();
        if ticket.send(ProbeReport { outcome, applied }).is_ok() {
            let _ = done.await;
        }
    }
}
