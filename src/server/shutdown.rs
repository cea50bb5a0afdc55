//! Graceful shutdown handling
//!
//! Turns the first SIGTERM or SIGINT into a single process-wide shutdown
//! signal. Every component that cares holds its own clone of
//! [`ShutdownSignal`] and observes the signal independently.

use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Receiving side of the shutdown signal
///
/// Clone it once per listener.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    ///
    /// Returns immediately if shutdown was already signaled.
    pub async fn wait(&mut self) {
        // wait_for also errors when the sender is gone, which counts as shutdown
        let _ = self.receiver.wait_for(|shutdown| *shutdown).await;
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Controller for triggering shutdown
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown
    ///
    /// Returns `true` only for the call that fired the signal.
    pub fn shutdown(&self) -> bool {
        let fired = self.sender.send_if_modified(|shutdown| {
            if *shutdown {
                false
            } else {
                *shutdown = true;
                true
            }
        });
        if fired {
            info!("Shutdown signal sent");
        }
        fired
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
///
/// Dropping the controller is treated as shutdown by every signal.
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Wait for SIGTERM or SIGINT signal
///
/// Returns the name of the signal that was received, or an error if the
/// handlers cannot be registered.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!(signal = name, "Received termination signal");
    Ok(name)
}

/// Wait for Ctrl+C signal (Windows)
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C");
    Ok("CTRL_C")
}

/// Spawn the task that fires `controller` on the first termination signal
///
/// Later signals are not listened for. If the handlers cannot be
/// registered the controller fires anyway so nothing waits forever on a
/// signal that can never arrive.
pub fn spawn_signal_handler(controller: ShutdownController) -> JoinHandle<()> {
    shutdown_on(controller, wait_for_signal())
}

/// Fire `controller` once `trigger` resolves, whether it succeeded or not
pub(crate) fn shutdown_on<F>(controller: ShutdownController, trigger: F) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<&'static str>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = trigger.await {
            warn!(error = %e, "Failed to register signal handlers, shutting down");
        }
        controller.shutdown();
    })
}
