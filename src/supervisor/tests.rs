use super::*;
use crate::config::FeedConfig;
use crate::release::ReleaseClient;
use crate::test_utils::{ArchiveBuilder, MockServer, init_test_logging};
use axum::http::StatusCode;
use std::time::Instant;
use tempfile::TempDir;

struct Harness {
    server: MockServer,
    temp: TempDir,
}

impl Harness {
    async fn new() -> Self {
        init_test_logging(None);
        Self {
            server: MockServer::start().await,
            temp: TempDir::new().unwrap(),
        }
    }

    fn coordinator(&self) -> UpdateCoordinator {
        let client = ReleaseClient::new(self.server.feed_url(), Duration::from_secs(5)).unwrap();
        UpdateCoordinator::new(client, self.temp.path(), &FeedConfig::default())
    }

    fn supervisor(&self, script: &str, interval: Duration, restart_delay: Duration) -> Supervisor {
        let probe =
            HealthProbe::new(self.server.url("/health"), Duration::from_millis(200)).unwrap();
        Supervisor::new(
            self.coordinator(),
            WorkerCommand::new("sh", self.temp.path()).arg("-c").arg(script),
            Watchdog::new(probe, interval),
            restart_delay,
        )
    }
}

#[tokio::test]
async fn test_worker_exit_code_is_reported() {
    let h = Harness::new().await;
    let mut supervisor = h.supervisor("exit 3", Duration::from_secs(10), Duration::ZERO);

    let report = supervisor.run_cycle().await;

    match report.exit {
        WorkerExit::Exited(status) => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected exit: {other:?}"),
    }
    assert_eq!(
        report.watchdog,
        Some(WatchdogReport {
            probes: 0,
            outcome: WatchdogOutcome::Cancelled
        })
    );
    assert!(matches!(report.update, UpdateOutcome::FetchFailed(_)));
    assert_eq!(supervisor.state(), SupervisorState::Stopping);
    assert_eq!(supervisor.cycles(), 1);
}

#[tokio::test]
async fn test_unresponsive_worker_is_killed() {
    let h = Harness::new().await;
    h.server.set_hang("/health");
    let interval = Duration::from_millis(100);
    let mut supervisor = h.supervisor("sleep 30", interval, Duration::ZERO);

    let start = Instant::now();
    let report = supervisor.run_cycle().await;

    // One interval plus one probe timeout, with scheduling slack
    assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
    match report.exit {
        WorkerExit::Terminated { reason, status } => {
            assert!(matches!(reason, ProbeFailure::Transport(_)));
            assert!(!status.unwrap().success());
        }
        other => panic!("unexpected exit: {other:?}"),
    }
    assert!(report.watchdog.unwrap().fired());
}

#[tokio::test]
async fn test_unhealthy_status_kills_worker() {
    let h = Harness::new().await;
    h.server.set_status("/health", StatusCode::SERVICE_UNAVAILABLE);
    let mut supervisor = h.supervisor("sleep 30", Duration::from_millis(50), Duration::ZERO);

    let report = supervisor.run_cycle().await;

    assert!(matches!(
        report.exit,
        WorkerExit::Terminated {
            reason: ProbeFailure::Status(503),
            ..
        }
    ));
}

#[tokio::test]
async fn test_healthy_worker_runs_to_completion() {
    let h = Harness::new().await;
    h.server.set_status("/health", StatusCode::OK);
    let mut supervisor = h.supervisor("sleep 0.5", Duration::from_millis(50), Duration::ZERO);

    let report = supervisor.run_cycle().await;

    assert!(matches!(report.exit, WorkerExit::Exited(status) if status.success()));
    let watchdog = report.watchdog.unwrap();
    assert_eq!(watchdog.outcome, WatchdogOutcome::Cancelled);
    assert!(watchdog.probes >= 2, "only {} probes", watchdog.probes);
}

#[tokio::test]
async fn test_no_probe_after_worker_exits() {
    let h = Harness::new().await;
    h.server.set_status("/health", StatusCode::INTERNAL_SERVER_ERROR);
    let mut supervisor = h.supervisor("exit 0", Duration::from_millis(300), Duration::ZERO);

    let report = supervisor.run_cycle().await;
    assert!(matches!(report.exit, WorkerExit::Exited(_)));

    // Well past the first tick of the cancelled watchdog
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(h.server.hits("/health"), 0);
    assert!(!report.watchdog.unwrap().fired());
}

#[tokio::test]
async fn test_launch_failure_is_not_fatal() {
    let h = Harness::new().await;
    let probe = HealthProbe::new(h.server.url("/health"), Duration::from_millis(200)).unwrap();
    let mut supervisor = Supervisor::new(
        h.coordinator(),
        WorkerCommand::new(h.temp.path().join("missing-runtime"), h.temp.path()),
        Watchdog::new(probe, Duration::from_millis(50)),
        Duration::from_millis(10),
    );

    let report = supervisor.run_cycle().await;
    assert!(matches!(report.exit, WorkerExit::LaunchFailed(LauncherError::Launch { .. })));
    assert!(report.watchdog.is_none());

    // The loop keeps going after a failed launch
    let cycles = supervisor.run_until(tokio::time::sleep(Duration::from_millis(200))).await;
    assert!(cycles >= 3, "only {cycles} cycles");
}

#[tokio::test]
async fn test_each_cycle_checks_for_updates() {
    let h = Harness::new().await;
    h.server.publish_release(
        "v1.0.0",
        "app-bundle.zip",
        ArchiveBuilder::new().file("index.js", b"v1").build(),
    );
    let mut supervisor = h.supervisor("exit 0", Duration::from_secs(10), Duration::from_millis(50));

    let cycles = supervisor.run_until(tokio::time::sleep(Duration::from_millis(600))).await;

    assert!(cycles >= 2, "only {cycles} cycles");
    assert!(h.server.feed_hits() as u64 >= cycles);
    assert_eq!(h.server.hits("/download/v1.0.0/app-bundle.zip"), 1);
    assert!(h.temp.path().join("index.js").exists());
}

#[tokio::test]
async fn test_state_sequence_of_one_cycle() {
    let h = Harness::new().await;
    let mut supervisor = h.supervisor("sleep 0.3", Duration::from_secs(10), Duration::ZERO);
    let mut states = supervisor.subscribe();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push(state);
            if state == SupervisorState::Stopping {
                break;
            }
        }
        seen
    });

    supervisor.run_cycle().await;
    let seen = observer.await.unwrap();

    // The receiver may coalesce the short-lived states but always sees
    // Running (held for the worker's lifetime) and the final Stopping
    assert!(seen.contains(&SupervisorState::Running), "{seen:?}");
    assert_eq!(seen.last(), Some(&SupervisorState::Stopping));
}

#[tokio::test]
async fn test_shutdown_interrupts_running_worker() {
    let h = Harness::new().await;
    let mut supervisor = h.supervisor("sleep 30", Duration::from_secs(10), Duration::ZERO);

    let start = Instant::now();
    let cycles = supervisor.run_until(tokio::time::sleep(Duration::from_millis(300))).await;

    assert_eq!(cycles, 0);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_worker_command_from_config() {
    let config = LauncherConfig::default();
    let install_dir = Path::new("/srv/launcher/bin");

    let command = WorkerCommand::from_config(&config, install_dir);

    assert_eq!(command.program(), install_dir.join(config.runtime.executable_file_name()));
    assert_eq!(
        command.arguments(),
        &["run".to_string(), "/srv/launcher/bin/index.js".to_string()]
    );
}

#[tokio::test]
async fn test_limited_run_waits_between_cycles() {
    let h = Harness::new().await;
    let restart_delay = Duration::from_millis(600);
    let mut supervisor = h.supervisor("exit 0", Duration::from_secs(10), restart_delay);
    let mut states = supervisor.subscribe();

    let observer = tokio::spawn(async move {
        let mut delayed = false;
        while states.changed().await.is_ok() {
            if *states.borrow_and_update() == SupervisorState::Delaying {
                delayed = true;
            }
        }
        delayed
    });

    let start = Instant::now();
    let cycles = supervisor.run_limited(Some(2), std::future::pending()).await;
    let elapsed = start.elapsed();

    assert_eq!(cycles, 2);
    assert!(elapsed >= restart_delay, "took {elapsed:?}");
    // One delay between the two cycles, none after the last
    assert!(elapsed < restart_delay * 2, "took {elapsed:?}");
    assert_eq!(supervisor.state(), SupervisorState::Stopping);

    drop(supervisor);
    assert!(observer.await.unwrap());
}
