//! Worker liveness watchdog.
//!
//! A worker can be alive as a process and still be useless (deadlocked,
//! wedged on I/O). The watchdog polls the worker's health endpoint once per
//! interval and, on the first unhealthy answer, sends a single
//! [`TerminateRequest`] to the supervisor and stops. It never touches the
//! child process itself; the supervisor owns the handle and does the kill.
//!
//! Healthy means the request completed and the status is exactly `200`.
//! Transport errors, timeouts and every other status are unhealthy.
//!
//! # Lifecycle
//!
//! One watchdog task exists per worker run. It is created by
//! [`Watchdog::spawn`] after the worker starts and stopped through
//! [`WatchdogHandle::stop`], which signals cancellation and waits for the task
//! to finish. Cancellation wins over a due tick and aborts an in-flight probe,
//! so no probe starts after the supervisor has observed the worker exit.

use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::constants::USER_AGENT;
use crate::core::LauncherError;

/// Why a probe judged the worker unhealthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Connection refused, timeout or another transport error.
    Transport(String),
    /// The endpoint answered with a status other than 200.
    Status(u16),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "health check failed: {reason}"),
            Self::Status(status) => write!(f, "health check returned HTTP {status}"),
        }
    }
}

/// Message from the watchdog asking the supervisor to kill the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminateRequest {
    /// The failed probe that triggered the request.
    pub reason: ProbeFailure,
}

/// Single bounded HTTP liveness request.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HealthProbe {
    /// Probe `url`, giving up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LauncherError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LauncherError::network("health probe setup", &e))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Endpoint being probed.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run one probe.
    pub async fn check(&self) -> Result<(), ProbeFailure> {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status() == StatusCode::OK => Ok(()),
            Ok(response) => Err(ProbeFailure::Status(response.status().as_u16())),
            Err(e) => Err(ProbeFailure::Transport(e.to_string())),
        }
    }
}

/// How a watchdog run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// Stopped by the supervisor; every probe passed.
    Cancelled,
    /// A probe failed and termination was requested.
    Fired(ProbeFailure),
    /// The watchdog task panicked or was aborted; its probe count is lost.
    Aborted(String),
}

/// Summary of one watchdog run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogReport {
    /// Probes started.
    pub probes: u32,
    /// How the run ended.
    pub outcome: WatchdogOutcome,
}

impl WatchdogReport {
    /// True if the watchdog asked for termination.
    pub fn fired(&self) -> bool {
        matches!(self.outcome, WatchdogOutcome::Fired(_))
    }
}

/// Periodic liveness checker for one worker run.
#[derive(Debug, Clone)]
pub struct Watchdog {
    probe: HealthProbe,
    interval: Duration,
}

impl Watchdog {
    /// Probe with `probe` every `interval`, first probe one interval after start.
    pub fn new(probe: HealthProbe, interval: Duration) -> Self {
        Self { probe, interval }
    }

    /// Start the watchdog as a task that reports to `terminate`.
    pub fn spawn(self, terminate: mpsc::Sender<TerminateRequest>) -> WatchdogHandle {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(cancel_rx, terminate));
        WatchdogHandle {
            cancel: Some(cancel_tx),
            task,
        }
    }

    /// Poll until cancelled or until a probe fails.
    ///
    /// Dropping the sender half of `cancel` counts as cancellation.
    pub async fn run(
        self,
        mut cancel: oneshot::Receiver<()>,
        terminate: mpsc::Sender<TerminateRequest>,
    ) -> WatchdogReport {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut probes = 0;

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => break,
                _ = ticker.tick() => {}
            }

            probes += 1;
            let result = tokio::select! {
                biased;
                _ = &mut cancel => break,
                result = self.probe.check() => result,
            };

            match result {
                Ok(()) => debug!(probe = probes, "Worker healthy"),
                Err(failure) => {
                    warn!("Worker unresponsive ({}), requesting termination", failure);
                    if terminate
                        .send(TerminateRequest {
                            reason: failure.clone(),
                        })
                        .await
                        .is_err()
                    {
                        debug!("Supervisor no longer listening for termination requests");
                    }
                    return WatchdogReport {
                        probes,
                        outcome: WatchdogOutcome::Fired(failure),
                    };
                }
            }
        }

        debug!(probes, "Watchdog stopped");
        WatchdogReport {
            probes,
            outcome: WatchdogOutcome::Cancelled,
        }
    }
}

/// Owner side of a running watchdog.
///
/// Dropping the handle cancels the watchdog without waiting for it.
#[derive(Debug)]
pub struct WatchdogHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<WatchdogReport>,
}

impl WatchdogHandle {
    /// Cancel the watchdog and wait until its task has finished.
    pub async fn stop(mut self) -> WatchdogReport {
        if let Some(cancel) = self.cancel.take() {
            // Err means the watchdog already finished on its own
            let _ = cancel.send(());
        }

        match (&mut self.task).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Watchdog task ended abnormally: {}", e);
                WatchdogReport {
                    probes: 0,
                    outcome: WatchdogOutcome::Aborted(e.to_string()),
                }
            }
        }
    }
}
