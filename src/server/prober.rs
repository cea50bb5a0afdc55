//! Probe server
//!
//! Every request runs a full poll against the gated app and answers with
//! an empty 200 on success or an empty 503 on failure.

use super::shutdown::ShutdownSignal;
use crate::probe::Poller;
use axum::{extract::State, http::StatusCode, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared state for the probe handler
#[derive(Clone)]
pub struct ProbeState {
    poller: Arc<Poller>,
    shutdown: ShutdownSignal,
}

impl ProbeState {
    /// `shutdown` cancels polls that are still running when the process stops
    pub fn new(poller: Poller, shutdown: ShutdownSignal) -> Self {
        Self {
            poller: Arc::new(poller),
            shutdown,
        }
    }
}

async fn handle(State(state): State<ProbeState>) -> StatusCode {
    info!("Prober received a request");

    match state.poller.poll(state.shutdown.clone()).await {
        Ok(attempts) => {
            info!(attempts, "Probe succeeded");
            StatusCode::OK
        }
        Err(e) => {
            warn!(error = %e, url = %state.poller.target().url, "Probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Build the probe router
fn build_router(state: ProbeState) -> Router {
    Router::new().fallback(handle).with_state(state)
}

/// Serve probes on an already bound listener until shutdown is signaled
pub async fn serve_prober(
    listener: TcpListener,
    state: ProbeState,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// Run the probe server on the specified port (HTTP)
pub async fn run_probe_server(
    port: u16,
    state: ProbeState,
    shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = %port, "Probe server listening (HTTP)");

    serve_prober(listener, state, shutdown).await
}
