use readygate::config::{PROBE_PORT, SHUTDOWN_GRACE_PERIOD};
use readygate::probe::{Poller, ProbeTarget};
use readygate::server::{run_probe_server, shutdown_channel, spawn_signal_handler, ProbeState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Prober started");

    let (shutdown_controller, mut shutdown_signal) = shutdown_channel();
    spawn_signal_handler(shutdown_controller);

    let target = ProbeTarget::default();
    info!(url = %target.url, "Probing target on every request");
    let poller = Poller::new(target)?;

    let mut server = tokio::spawn(run_probe_server(
        PROBE_PORT,
        ProbeState::new(poller, shutdown_signal.clone()),
        shutdown_signal.clone(),
    ));

    tokio::select! {
        res = &mut server => {
            // Only reachable if the server failed before shutdown was requested
            res??;
            return Ok(());
        }
        _ = shutdown_signal.wait() => {
            info!("Initiating graceful shutdown");
        }
    }

    match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, server).await {
        Ok(res) => res??,
        Err(_) => warn!(
            grace_period = ?SHUTDOWN_GRACE_PERIOD,
            "In-flight probes did not finish in time, exiting anyway"
        ),
    }

    info!("Prober shut down gracefully");
    Ok(())
}
