//! Circuit status and call outcome types.

use serde::Serialize;
use tokio::sync::oneshot;

/// Stored status of a command.
///
/// Half-open is not stored: it only exists for the single call that claims
/// the probe ticket offered by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    Closed,
    Open,
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitStatus::Closed => write!(f, "closed"),
            CircuitStatus::Open => write!(f, "open"),
        }
    }
}

/// How the breaker handled a single guarded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The operation ran as a normal call.
    Admitted,
    /// The operation ran as the recovery probe.
    Probe,
    /// The circuit is open; the operation did not run.
    Rejected,
}

impl Admission {
    /// True only for normal admitted calls. A probe does not report itself
    /// as admitted.
    pub fn is_admitted(self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Result of a probe call as seen by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
}

impl ProbeOutcome {
    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            ProbeOutcome::Success
        } else {
            ProbeOutcome::Failure
        }
    }
}

/// Outcome published by the probe call.
///
/// `applied` is answered by the prober once the outcome has been acted on, so
/// the probe call returns only after a successful probe has closed the circuit.
#[derive(Debug)]
pub(crate) struct ProbeReport {
    pub outcome: ProbeOutcome,
    pub applied: oneshot::Sender<()>,
}

/// Single-use ticket handed out by the prober on each tick.
pub(crate) type ProbeTicket = oneshot::Sender<ProbeReport>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_normal_calls_count_as_admitted() {
        assert!(Admission::Admitted.is_admitted());
        assert!(!Admission::Probe.is_admitted());
        assert!(!Admission::Rejected.is_admitted());
    }

    #[test]
    fn test_probe_outcome_from_result() {
        let ok: Result<(), &str> = Ok(());
        let err: Result<(), &str> = Err("down");
        assert_eq!(ProbeOutcome::from_result(&ok), ProbeOutcome::Success);
        assert_eq!(ProbeOutcome::from_result(&err), ProbeOutcome::Failure);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CircuitStatus::Open).unwrap(), "\"open\"");
        assert_eq!(CircuitStatus::Closed.to_string(), "closed");
    }
}
