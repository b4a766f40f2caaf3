//! Shared helpers for breaker integration tests.

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use circuit_breaker::CommandConfig;
use futures_util::future::BoxFuture;

pub type Outcome = Result<(), &'static str>;

/// Counts how many times an operation actually ran.
#[derive(Clone, Default)]
pub struct Tally(Arc<AtomicU32>);

#[allow(dead_code)]
impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    /// Operation that records a run and succeeds.
    pub fn succeed(&self) -> impl FnOnce() -> Ready<Outcome> {
        let runs = self.0.clone();
        move || {
            runs.fetch_add(1, Ordering::SeqCst);
            ready(Ok(()))
        }
    }

    /// Operation that records a run and fails.
    pub fn fail(&self) -> impl FnOnce() -> Ready<Outcome> {
        let runs = self.0.clone();
        move || {
            runs.fetch_add(1, Ordering::SeqCst);
            ready(Err("dependency down"))
        }
    }

    /// Operation that records a run, takes `delay`, then succeeds.
    pub fn slow_succeed(&self, delay: Duration) -> impl FnOnce() -> BoxFuture<'static, Outcome> {
        let runs = self.0.clone();
        move || {
            runs.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(())
            })
        }
    }
}

/// Config plus a counter of fallback invocations.
#[allow(dead_code)]
pub fn config_with_fallback(
    threshold: u32,
    window: Duration,
    probe_interval: Duration,
) -> (CommandConfig, Tally) {
    let fallbacks = Tally::new();
    let counter = fallbacks.0.clone();
    let config = CommandConfig::new(threshold, window, probe_interval).with_fallback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (config, fallbacks)
}
