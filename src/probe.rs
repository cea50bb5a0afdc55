//! Bounded polling against the gated app
//!
//! A poll is a sequence of GET attempts at a fixed interval. The first
//! attempt goes out immediately. Each attempt has its own short timeout; the
//! whole sequence has an overall deadline and can be cut short by shutdown.
//! Failed attempts are logged and retried, only the aggregate outcome is
//! returned.

use crate::config::{ATTEMPT_TIMEOUT, POLL_DEADLINE, POLL_INTERVAL, PROBE_TARGET_URL};
use crate::server::ShutdownSignal;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

/// Error from a single poll attempt. Always retried.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// Aggregate failure of a poll
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("no 200 response within the poll deadline after {attempts} attempts")]
    DeadlineExceeded { attempts: u32 },

    #[error("poll cancelled by shutdown after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

enum PollEnd {
    Succeeded,
    DeadlineExceeded,
    Cancelled,
}

/// What to poll and how
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub url: String,
    pub attempt_timeout: Duration,
    pub interval: Duration,
    pub deadline: Duration,
}

impl ProbeTarget {
    /// Target `url` with the default timing
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for ProbeTarget {
    fn default() -> Self {
        Self {
            url: PROBE_TARGET_URL.to_string(),
            attempt_timeout: ATTEMPT_TIMEOUT,
            interval: POLL_INTERVAL,
            deadline: POLL_DEADLINE,
        }
    }
}

/// Runs polls against a fixed target
///
/// Holds one HTTP client for the life of the process so connections from
/// earlier attempts can be reused.
#[derive(Debug, Clone)]
pub struct Poller {
    client: Client,
    target: ProbeTarget,
}

impl Poller {
    /// Build a poller whose client enforces the per-attempt timeout
    pub fn new(target: ProbeTarget) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(target.attempt_timeout).build()?;
        Ok(Self { client, target })
    }

    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }

    /// Poll until the target answers 200, the deadline passes, or shutdown
    ///
    /// Returns the number of attempts it took on success.
    pub async fn poll(&self, mut shutdown: ShutdownSignal) -> Result<u32, PollError> {
        let deadline = Instant::now() + self.target.deadline;
        let mut attempts = 0u32;

        let end = {
            let attempts = &mut attempts;
            let until_ok = async move {
                let mut ticker = tokio::time::interval(self.target.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    *attempts += 1;
                    match self.attempt().await {
                        Ok(()) => return,
                        Err(e) => info!(attempt = *attempts, error = %e, "Poll attempt failed"),
                    }
                }
            };

            // Dropping `until_ok` abandons any attempt still in flight
            tokio::select! {
                biased;
                _ = shutdown.wait() => PollEnd::Cancelled,
                res = tokio::time::timeout_at(deadline, until_ok) => match res {
                    Ok(()) => PollEnd::Succeeded,
                    Err(_) => PollEnd::DeadlineExceeded,
                },
            }
        };

        match end {
            PollEnd::Succeeded => Ok(attempts),
            PollEnd::DeadlineExceeded => Err(PollError::DeadlineExceeded { attempts }),
            PollEnd::Cancelled => Err(PollError::Cancelled { attempts }),
        }
    }

    /// One GET against the target
    ///
    /// The body is always read to the end before the response is dropped so
    /// the connection can go back to the pool, whatever the status.
    async fn attempt(&self) -> Result<(), AttemptError> {
        let response = self.client.get(&self.target.url).send().await?;
        let status = response.status();
        info!(status = status.as_u16(), "Prober received a response");

        // Read errors only cost us the connection reuse
        let _ = response.bytes().await;

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(AttemptError::Status(status))
        }
    }
}

#[cfg(test)]
#[path = "probe_test.rs"]
mod tests;
