//! Supervision cycles driving a real child process.
//!
//! The runtime is a shell script standing in for bun, so these only run on unix.

#![cfg(unix)]

use crate::common::{Site, bundle};
use axum::http::StatusCode;
use bundlekeeper::release::ReleaseClient;
use bundlekeeper::supervisor::{ProbeFailure, Supervisor, SupervisorState, WorkerExit};
use bundlekeeper::update::{UpdateCoordinator, UpdateOutcome};
use std::time::{Duration, Instant};

fn supervisor(site: &Site) -> Supervisor {
    let config = site.config();
    let client = ReleaseClient::from_config(&config.feed).unwrap();
    let coordinator = UpdateCoordinator::new(client, site.install_dir(), &config.feed);
    Supervisor::from_config(&config, &site.install_dir(), coordinator).unwrap()
}

#[tokio::test]
async fn test_cycle_installs_then_runs_new_bundle() {
    let site = Site::new().await;
    site.install_fake_runtime();
    site.server
        .publish_release("v2.0.0", "app-bundle.zip", bundle("echo v2 > ran.txt\nexit 0\n"));
    let mut supervisor = supervisor(&site);

    let report = supervisor.run_cycle().await;

    assert!(matches!(report.update, UpdateOutcome::Updated { .. }), "{}", report.update);
    match report.exit {
        WorkerExit::Exited(status) => assert!(status.success()),
        other => panic!("unexpected exit: {other:?}"),
    }
    assert_eq!(site.read_installed("ran.txt").trim(), "v2");
    assert_eq!(supervisor.state(), SupervisorState::Stopping);
}

#[tokio::test]
async fn test_hung_worker_is_replaced() {
    let site = Site::new().await;
    site.install_fake_runtime();
    site.server
        .publish_release("v1.0.0", "app-bundle.zip", bundle("sleep 30\n"));
    site.server.set_hang("/health");
    let mut supervisor = supervisor(&site);

    let start = Instant::now();
    let report = supervisor.run_cycle().await;

    assert!(start.elapsed() < Duration::from_secs(6), "took {:?}", start.elapsed());
    match report.exit {
        WorkerExit::Terminated { reason, .. } => {
            assert!(matches!(reason, ProbeFailure::Transport(_)))
        }
        other => panic!("unexpected exit: {other:?}"),
    }
    assert!(report.watchdog.unwrap().fired());
}

#[tokio::test]
async fn test_unhealthy_status_terminates_worker() {
    let site = Site::new().await;
    site.install_fake_runtime();
    site.server
        .publish_release("v1.0.0", "app-bundle.zip", bundle("sleep 30\n"));
    site.server.set_status("/health", StatusCode::SERVICE_UNAVAILABLE);
    let mut supervisor = supervisor(&site);

    let report = supervisor.run_cycle().await;

    match report.exit {
        WorkerExit::Terminated { reason, status } => {
            assert_eq!(reason, ProbeFailure::Status(503));
            assert!(!status.unwrap().success());
        }
        other => panic!("unexpected exit: {other:?}"),
    }
}

#[tokio::test]
async fn test_quick_exit_is_never_probed() {
    let site = Site::new().await;
    site.install_fake_runtime();
    site.server
        .publish_release("v1.0.0", "app-bundle.zip", bundle("exit 7\n"));
    site.server.set_status("/health", StatusCode::OK);
    let mut supervisor = supervisor(&site);

    let report = supervisor.run_cycle().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    match report.exit {
        WorkerExit::Exited(status) => assert_eq!(status.code(), Some(7)),
        other => panic!("unexpected exit: {other:?}"),
    }
    assert_eq!(report.watchdog.unwrap().probes, 0);
    assert_eq!(site.server.hits("/health"), 0);
}

#[tokio::test]
async fn test_run_until_restarts_and_stops() {
    let site = Site::new().await;
    site.install_fake_runtime();
    site.server
        .publish_release("v1.0.0", "app-bundle.zip", bundle("exit 0\n"));
    let mut supervisor = supervisor(&site);

    let cycles = supervisor
        .run_until(tokio::time::sleep(Duration::from_millis(800)))
        .await;

    assert!(cycles >= 2, "only {cycles} cycles");
    assert_eq!(site.server.hits("/download/v1.0.0/app-bundle.zip"), 1);
    assert!(site.server.feed_hits() as u64 >= cycles);
}
