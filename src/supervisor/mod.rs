//! Process supervision.
//!
//! The [`Supervisor`] is an endless state machine, one pass per cycle:
//!
//! ```text
//!   ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌──────────┐   ┌──────────┐
//!   │ Updating │──▶│ Launching │──▶│ Running │──▶│ Stopping │──▶│ Delaying │──┐
//!   └──────────┘   └───────────┘   └─────────┘   └──────────┘   └──────────┘  │
//!        ▲               │ launch failed              ▲                       │
//!        │               └────────────────────────────┘                       │
//!        └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Updating**: one [`UpdateCoordinator::ensure_updated`] call. The outcome
//!   is logged and never stops the loop.
//! - **Launching**: spawn the runtime with the bundle entry point, stdio
//!   inherited.
//! - **Running**: wait for the worker to exit while a [`Watchdog`] probes it.
//!   A [`TerminateRequest`] from the watchdog makes the supervisor kill the
//!   worker and keep waiting for the exit.
//! - **Stopping**: cancel the watchdog and wait for its task to end, so no
//!   watchdog from this cycle can outlive the worker it was watching.
//! - **Delaying**: fixed pause before the next cycle.
//!
//! Exactly one worker exists per cycle. The supervisor owns the child handle;
//! the watchdog only holds a channel sender.
//!
//! There is no terminal state. [`Supervisor::run_until`] exits when its
//! shutdown future resolves; the worker is killed when its handle drops.

pub mod lock;
pub mod watchdog;

pub use lock::InstallLock;
pub use watchdog::{
    HealthProbe, ProbeFailure, TerminateRequest, Watchdog, WatchdogHandle, WatchdogOutcome,
    WatchdogReport,
};

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::LauncherConfig;
use crate::core::LauncherError;
use crate::update::{UpdateCoordinator, UpdateOutcome};

/// Named states of the supervision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Checking the release feed.
    Updating,
    /// Starting the worker.
    Launching,
    /// Worker alive, watchdog active.
    Running,
    /// Worker gone, watchdog being stopped.
    Stopping,
    /// Pausing before the next cycle.
    Delaying,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Updating => "updating",
            Self::Launching => "launching",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Delaying => "delaying",
        };
        f.write_str(name)
    }
}

/// How to start the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl WorkerCommand {
    /// `program` run from `working_dir` with no arguments.
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    /// `<install_dir>/<runtime> <runtime args...> <install_dir>/<entry point>`.
    pub fn from_config(config: &LauncherConfig, install_dir: &Path) -> Self {
        let entry_point = install_dir.join(&config.bundle.entry_point);
        Self::new(install_dir.join(config.runtime.executable_file_name()), install_dir)
            .args(config.runtime.args.iter().cloned())
            .arg(entry_point.to_string_lossy())
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments after the program.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Start the worker with inherited stdio. The child is killed if its
    /// handle is dropped.
    pub fn spawn(&self) -> Result<Child, LauncherError> {
        Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LauncherError::Launch {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })
    }
}

/// How the worker of one cycle ended.
#[derive(Debug)]
pub enum WorkerExit {
    /// Exited on its own (clean exit or crash).
    Exited(ExitStatus),
    /// Killed at the watchdog's request.
    Terminated {
        /// Probe failure that triggered the kill.
        reason: ProbeFailure,
        /// Exit status after the kill, if it could be collected.
        status: Option<ExitStatus>,
    },
    /// Could not be started.
    LaunchFailed(LauncherError),
    /// Started, but waiting on it failed.
    WaitFailed(String),
}

/// Everything that happened in one cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// Update check result.
    pub update: UpdateOutcome,
    /// Worker fate.
    pub exit: WorkerExit,
    /// Watchdog summary; `None` when no worker was started.
    pub watchdog: Option<WatchdogReport>,
}

/// The update / launch / watch / restart loop.
pub struct Supervisor {
    coordinator: UpdateCoordinator,
    command: WorkerCommand,
    watchdog: Watchdog,
    restart_delay: Duration,
    state: watch::Sender<SupervisorState>,
    cycles: u64,
}

impl Supervisor {
    /// Assemble a supervisor from its parts.
    pub fn new(
        coordinator: UpdateCoordinator,
        command: WorkerCommand,
        watchdog: Watchdog,
        restart_delay: Duration,
    ) -> Self {
        Self {
            coordinator,
            command,
            watchdog,
            restart_delay,
            state: watch::Sender::new(SupervisorState::Updating),
            cycles: 0,
        }
    }

    /// Build the worker command and watchdog from configuration.
    pub fn from_config(
        config: &LauncherConfig,
        install_dir: &Path,
        coordinator: UpdateCoordinator,
    ) -> Result<Self, LauncherError> {
        let probe =
            HealthProbe::new(config.watchdog.health_url.clone(), config.watchdog.probe_timeout())?;
        Ok(Self::new(
            coordinator,
            WorkerCommand::from_config(config, install_dir),
            Watchdog::new(probe, config.watchdog.interval()),
            config.supervisor.restart_delay(),
        ))
    }

    /// Current state.
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn transition(&self, next: SupervisorState) {
        let previous = self.state.send_replace(next);
        debug!(from = %previous, to = %next, "Supervisor state change");
    }

    /// Run one cycle from `Updating` through `Stopping`.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.transition(SupervisorState::Updating);
        let update = self.coordinator.ensure_updated().await;
        debug!("Update check: {}", update);

        self.transition(SupervisorState::Launching);
        let mut child = match self.command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("{}", e);
                self.transition(SupervisorState::Stopping);
                self.cycles += 1;
                return CycleReport {
                    update,
                    exit: WorkerExit::LaunchFailed(e),
                    watchdog: None,
                };
            }
        };
        info!(pid = ?child.id(), "Worker started: {}", self.command.program.display());

        let (terminate_tx, mut terminate_rx) = mpsc::channel(1);
        let watchdog = self.watchdog.clone().spawn(terminate_tx);

        self.transition(SupervisorState::Running);
        let exit = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => WorkerExit::Exited(status),
                Err(e) => WorkerExit::WaitFailed(e.to_string()),
            },
            Some(request) = terminate_rx.recv() => {
                warn!("Terminating worker: {}", request.reason);
                if let Err(e) = child.start_kill() {
                    debug!("Kill request failed, worker probably already exited: {}", e);
                }
                let status = match child.wait().await {
                    Ok(status) => Some(status),
                    Err(e) => {
                        warn!("Could not collect worker exit status: {}", e);
                        None
                    }
                };
                WorkerExit::Terminated { reason: request.reason, status }
            }
        };
        log_exit(&exit);

        self.transition(SupervisorState::Stopping);
        let watchdog = watchdog.stop().await;
        self.cycles += 1;

        CycleReport {
            update,
            exit,
            watchdog: Some(watchdog),
        }
    }

    /// Cycle forever until `shutdown` resolves. Returns the completed cycle count.
    ///
    /// Shutdown is honoured at any point in a cycle. An interrupted cycle
    /// drops its worker handle (killing the worker) and its watchdog.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        self.run_limited(None, shutdown).await
    }

    /// Like [`run_until`](Self::run_until), but stop after `max_cycles`
    /// completed cycles when a limit is given.
    ///
    /// Cycles are separated by the usual `Delaying` state and restart delay;
    /// there is no delay after the last one.
    pub async fn run_limited<F>(&mut self, max_cycles: Option<u64>, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = self.run_cycle() => {}
                _ = &mut shutdown => break,
            }
            if max_cycles.is_some_and(|limit| self.cycles >= limit) {
                break;
            }

            self.transition(SupervisorState::Delaying);
            info!("Restarting worker in {:?}", self.restart_delay);
            tokio::select! {
                _ = tokio::time::sleep(self.restart_delay) => {}
                _ = &mut shutdown => break,
            }
        }

        info!(cycles = self.cycles, "Supervisor shutting down");
        self.cycles
    }

    /// Cycle until the process is killed.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending::<()>()).await;
    }
}

fn log_exit(exit: &WorkerExit) {
    match exit {
        WorkerExit::Exited(status) if status.success() => info!("Worker exited cleanly"),
        WorkerExit::Exited(status) => error!("Worker exited with {}", status),
        WorkerExit::Terminated { status, .. } => {
            warn!("Worker terminated by watchdog (status: {:?})", status)
        }
        WorkerExit::LaunchFailed(e) => error!("{}", e),
        WorkerExit::WaitFailed(reason) => error!("Lost track of worker: {}", reason),
    }
}

#[cfg(all(test, unix))]
mod tests;
