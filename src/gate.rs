//! Readiness gate with delayed activation
//!
//! The gate starts closed and opens exactly once, when the startup delay
//! elapses. If shutdown is signaled first the gate stays closed for the
//! rest of the process lifetime.

use crate::server::ShutdownSignal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Process-wide readiness flag
///
/// Cloning shares the flag. Reads are a single atomic load, so request
/// handlers can check it without contention.
#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    /// Create a new gate (initially not ready)
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate
    ///
    /// Returns `true` only for the call that performed the transition.
    /// There is no way back to not-ready.
    pub fn activate(&self) -> bool {
        self.ready
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Check if the gate is open
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// How the delayed-activation race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The delay elapsed and the gate was opened
    Activated,
    /// Shutdown was signaled before the delay elapsed
    Cancelled,
}

/// Spawn the one-shot task that opens `gate` after `delay`
///
/// Races the delay against `shutdown`. Shutdown is polled first, and checked
/// again right before activating, so a shutdown that lands together with the
/// timer still keeps the gate closed.
pub fn spawn_delayed_activation(
    gate: ReadinessGate,
    delay: Duration,
    mut shutdown: ShutdownSignal,
) -> JoinHandle<Activation> {
    tokio::spawn(async move {
        info!(delay = ?delay, "Sleeping before accepting requests");

        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                info!("Shutdown before startup delay elapsed, staying not ready");
                return Activation::Cancelled;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        if shutdown.is_shutdown() {
            info!("Shutdown before startup delay elapsed, staying not ready");
            return Activation::Cancelled;
        }

        gate.activate();
        info!("Sleeping done, accepting requests");
        Activation::Activated
    })
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
