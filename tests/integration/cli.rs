//! The `bundlekeeper` binary end to end.
//!
//! Commands run on a blocking thread so the mock server keeps answering on the
//! multi-threaded test runtime.

use crate::common::{Site, bundle};
use assert_cmd::Command;
use bundlekeeper::test_utils::unused_local_url;
use predicates::prelude::*;
use std::path::PathBuf;

fn bundlekeeper(base_dir: PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("bundlekeeper").unwrap();
    cmd.arg("--base-dir")
        .arg(base_dir)
        .arg("--no-progress")
        .arg("--no-pause")
        .env_remove("BUNDLEKEEPER_CONFIG_PATH")
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "info");
    cmd
}

async fn blocking<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap();
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("bundlekeeper")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("run"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_on_empty_install() {
    let site = Site::new().await;
    site.write_config(&site.config());
    let base = site.base_dir().to_path_buf();
    let expected_feed = site.server.feed_url();

    blocking(move || {
        let output = bundlekeeper(base).args(["status", "--json"]).output().unwrap();
        assert!(output.status.success());
        let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(status["version"], serde_json::Value::Null);
        assert_eq!(status["bundle_installed"], false);
        assert_eq!(status["runtime_installed"], false);
        assert_eq!(status["feed_url"], expected_feed.as_str());
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_installs_published_release() {
    let site = Site::new().await;
    site.write_config(&site.config());
    site.server
        .publish_release("v3.1.0", "app-bundle.zip", bundle("console.log('v3')"));
    let base = site.base_dir().to_path_buf();

    let first = base.clone();
    blocking(move || {
        bundlekeeper(first)
            .arg("check")
            .assert()
            .success()
            .stdout(predicate::str::contains("Updated:"))
            .stdout(predicate::str::contains("v3.1.0"));
    })
    .await;
    assert_eq!(site.read_installed("version"), "v3.1.0");

    blocking(move || {
        bundlekeeper(base)
            .arg("check")
            .assert()
            .success()
            .stdout(predicate::str::contains("Up to date: v3.1.0"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_fails_when_feed_is_down() {
    let site = Site::new().await;
    let mut config = site.config();
    config.feed.url = Some(unused_local_url("/releases/latest"));
    site.write_config(&config);
    let base = site.base_dir().to_path_buf();

    blocking(move || {
        bundlekeeper(base)
            .arg("check")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("error"));
    })
    .await;
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_run_single_cycle_with_installed_bundle() {
    let site = Site::new().await;
    site.write_config(&site.config());
    site.install_fake_runtime();
    std::fs::write(site.install_dir().join("index.js"), "echo ran > ran.txt\n").unwrap();
    site.server.set_status("/health", axum::http::StatusCode::OK);
    let base = site.base_dir().to_path_buf();

    blocking(move || {
        bundlekeeper(base)
            .args(["run", "--max-cycles", "1"])
            .assert()
            .success();
    })
    .await;

    // The feed has nothing published, so the installed bundle was kept and run
    assert_eq!(site.read_installed("ran.txt").trim(), "ran");
    assert!(site.server.feed_hits() >= 1);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_run_without_any_bundle_is_fatal() {
    let site = Site::new().await;
    let mut config = site.config();
    config.feed.url = Some(unused_local_url("/releases/latest"));
    site.write_config(&config);
    site.install_fake_runtime();
    let base = site.base_dir().to_path_buf();

    blocking(move || {
        bundlekeeper(base)
            .arg("run")
            .write_stdin("\n")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Bootstrap failed"))
            .stderr(predicate::str::contains("Press Enter").not());
    })
    .await;
}
