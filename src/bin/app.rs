use readygate::config::{start_delay_from_env, APP_PORT, SHUTDOWN_GRACE_PERIOD};
use readygate::gate::{spawn_delayed_activation, ReadinessGate};
use readygate::server::{run_app_server, shutdown_channel, spawn_signal_handler, AppState};
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

    info!("App started");

    let (shutdown_controller, mut shutdown_signal) = shutdown_channel();
    spawn_signal_handler(shutdown_controller);

    let gate = ReadinessGate::new();
    let delay = start_delay_from_env();
    spawn_delayed_activation(gate.clone(), delay, shutdown_signal.clone());

    let mut server = tokio::spawn(run_app_server(
        APP_PORT,
        AppState::new(gate),
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
            "In-flight requests did not finish in time, exiting anyway"
        ),
    }

    info!("App shut down gracefully");
    Ok(())
}
