//! Tests for the probe server, end to end against a gated app

use super::*;
use crate::config::SHUTDOWN_GRACE_PERIOD;
use crate::gate::ReadinessGate;
use crate::probe::{Poller, ProbeTarget};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no local addr");
    (listener, addr)
}

async fn start_app(
    gate: ReadinessGate,
    shutdown: ShutdownSignal,
) -> (SocketAddr, JoinHandle<Result<(), std::io::Error>>) {
    let (listener, addr) = bind().await;
    let handle = tokio::spawn(serve_app(listener, AppState::new(gate), shutdown));
    (addr, handle)
}

async fn start_prober(
    target: ProbeTarget,
    shutdown: ShutdownSignal,
) -> (SocketAddr, JoinHandle<Result<(), std::io::Error>>) {
    let (listener, addr) = bind().await;
    let poller = Poller::new(target).expect("Failed to build poller");
    let state = ProbeState::new(poller, shutdown.clone());
    let handle = tokio::spawn(serve_prober(listener, state, shutdown));
    (addr, handle)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_probe_returns_200_when_app_ready() {
    let (_controller, signal) = shutdown_channel();
    let gate = ReadinessGate::new();
    gate.activate();
    let (app_addr, app) = start_app(gate, signal.clone()).await;
    let (probe_addr, prober) =
        start_prober(ProbeTarget::new(format!("http://{}", app_addr)), signal).await;
    let client = client();

    let start = Instant::now();
    let response = client
        .get(format!("http://{}/", probe_addr))
        .send()
        .await
        .expect("Failed to connect to probe server");

    let elapsed = start.elapsed();
    assert_eq!(response.status(), 200);
    assert!(
        elapsed < Duration::from_millis(100),
        "ready app should be confirmed on the first attempt, took {:?}",
        elapsed
    );
    let body = response.text().await.expect("Failed to read body");
    assert!(body.is_empty());

    app.abort();
    prober.abort();
}

#[tokio::test]
async fn test_probe_returns_503_when_app_unreachable() {
    let (_controller, signal) = shutdown_channel();
    let (listener, app_addr) = bind().await;
    drop(listener);

    let target = ProbeTarget {
        deadline: Duration::from_millis(300),
        ..ProbeTarget::new(format!("http://{}", app_addr))
    };
    let (probe_addr, prober) = start_prober(target, signal).await;

    let start = Instant::now();
    let response = client()
        .get(format!("http://{}/any/path", probe_addr))
        .send()
        .await
        .expect("Failed to connect to probe server");

    assert_eq!(response.status(), 503);
    assert!(start.elapsed() >= Duration::from_millis(300));
    let body = response.text().await.expect("Failed to read body");
    assert!(body.is_empty());

    prober.abort();
}

#[tokio::test]
async fn test_concurrent_probes_poll_independently() {
    let (_controller, signal) = shutdown_channel();
    let gate = ReadinessGate::new();
    let (app_addr, app) = start_app(gate.clone(), signal.clone()).await;
    let (probe_addr, prober) =
        start_prober(ProbeTarget::new(format!("http://{}", app_addr)), signal).await;
    let client = client();

    let requests: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            let url = format!("http://{}/", probe_addr);
            tokio::spawn(async move { client.get(url).send().await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    gate.activate();

    for request in requests {
        let response = request
            .await
            .expect("request task panicked")
            .expect("Failed to connect to probe server");
        assert_eq!(response.status(), 200);
    }

    app.abort();
    prober.abort();
}

/// Shutdown cancels running polls so the server can drain quickly
#[tokio::test]
async fn test_shutdown_answers_in_flight_probe_with_503() {
    let (controller, signal) = shutdown_channel();
    let (app_addr, app) = start_app(ReadinessGate::new(), signal.clone()).await;
    let (probe_addr, prober) =
        start_prober(ProbeTarget::new(format!("http://{}", app_addr)), signal).await;

    let in_flight = tokio::spawn(async move {
        client()
            .get(format!("http://{}/", probe_addr))
            .send()
            .await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let start = Instant::now();
    controller.shutdown();

    let response = in_flight
        .await
        .expect("request task panicked")
        .expect("in-flight probe should still get an answer");
    assert_eq!(response.status(), 503);
    assert!(start.elapsed() < Duration::from_secs(1));

    let stopped = tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, prober).await;
    assert!(stopped.is_ok(), "probe server should stop within the grace period");

    app.abort();
}
