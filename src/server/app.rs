//! Gated app server
//!
//! Answers any method on any path. While the readiness gate is closed every
//! request gets an empty 500; once open, a greeting with a timestamp.

use super::shutdown::ShutdownSignal;
use crate::clock::{stamp_milli, Clock, SystemClock};
use crate::gate::ReadinessGate;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Fixed part of the ready response body
pub const GREETING: &str = "Hello World! How about some tasty noodles? ";

/// Shared state for the app handler
#[derive(Clone)]
pub struct AppState {
    gate: ReadinessGate,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create app state backed by the system clock
    pub fn new(gate: ReadinessGate) -> Self {
        Self::with_clock(gate, Arc::new(SystemClock))
    }

    /// Create app state with an explicit time source
    pub fn with_clock(gate: ReadinessGate, clock: Arc<dyn Clock>) -> Self {
        Self { gate, clock }
    }
}

/// Render the ready response body for the current time
fn greeting(clock: &dyn Clock) -> String {
    format!("{} {}\n", GREETING, stamp_milli(clock.now()))
}

async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    if !state.gate.is_ready() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    info!("App received a request");
    (StatusCode::OK, greeting(state.clock.as_ref())).into_response()
}

/// Build the app router
fn build_router(state: AppState) -> Router {
    Router::new().fallback(handle).with_state(state)
}

/// Serve the app on an already bound listener until shutdown is signaled
///
/// New connections stop being accepted once `shutdown` fires; the future
/// resolves after in-flight requests finish. Callers bound that wait with
/// [`crate::config::SHUTDOWN_GRACE_PERIOD`].
pub async fn serve_app(
    listener: TcpListener,
    state: AppState,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// Run the app server on the specified port (HTTP)
///
/// # Arguments
/// * `port` - The port to listen on
/// * `state` - Readiness gate and clock shared with the handler
/// * `shutdown` - Signal that stops the server
pub async fn run_app_server(
    port: u16,
    state: AppState,
    shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    // Log after successful bind - server is actually listening
    info!(port = %port, "App server listening (HTTP)");

    serve_app(listener, state, shutdown).await
}
