//! HTTP servers for the gated app and the prober
//!
//! - app: serves a greeting once the readiness gate is open, 500 before
//! - prober: polls the app per request, 200 on success, 503 on failure
//!
//! Also provides graceful shutdown handling for SIGTERM/SIGINT.

mod app;
mod prober;
pub mod shutdown;

pub use app::{run_app_server, serve_app, AppState, GREETING};
pub use prober::{run_probe_server, serve_prober, ProbeState};
pub use shutdown::{
    shutdown_channel, spawn_signal_handler, wait_for_signal, ShutdownController, ShutdownSignal,
};

#[cfg(test)]
#[path = "app_test.rs"]
mod app_tests;

#[cfg(test)]
#[path = "prober_test.rs"]
mod prober_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
