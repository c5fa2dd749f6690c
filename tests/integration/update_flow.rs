//! Update checks against a live mock feed.

use crate::common::{Site, bundle};
use bundlekeeper::core::LauncherError;
use bundlekeeper::installer::extract_archive;
use bundlekeeper::release::ReleaseClient;
use bundlekeeper::test_utils::ArchiveBuilder;
use bundlekeeper::update::{UpdateCoordinator, UpdateOutcome, VersionStore};

fn coordinator(site: &Site) -> UpdateCoordinator {
    let config = site.config();
    let client = ReleaseClient::from_config(&config.feed).unwrap();
    UpdateCoordinator::new(client, site.install_dir(), &config.feed)
}

#[tokio::test]
async fn test_first_install_from_feed() {
    let site = Site::new().await;
    site.server.publish_release("v2.0.0", "app-bundle.zip", bundle("console.log('v2')"));

    let outcome = coordinator(&site).ensure_updated().await;

    assert!(outcome.is_updated(), "{outcome}");
    assert_eq!(site.read_installed("index.js"), "console.log('v2')");
    assert_eq!(VersionStore::new(&site.install_dir()).read().await, "v2.0.0");
}

#[tokio::test]
async fn test_repeated_checks_download_once() {
    let site = Site::new().await;
    let download = site.server.publish_release("v2.0.0", "app-bundle.zip", bundle("v2"));
    let coordinator = coordinator(&site);

    let outcomes = [
        coordinator.ensure_updated().await,
        coordinator.ensure_updated().await,
        coordinator.ensure_updated().await,
    ];

    assert!(outcomes[0].is_updated());
    for outcome in &outcomes[1..] {
        assert_eq!(
            outcome,
            &UpdateOutcome::Unchanged {
                version: "v2.0.0".to_string()
            }
        );
    }
    assert_eq!(site.server.hits(&download), 1);
    assert_eq!(site.server.feed_hits(), 3);
}

#[tokio::test]
async fn test_failed_install_is_retried_next_check() {
    let site = Site::new().await;
    site.server.publish_release("v2.0.0", "app-bundle.zip", b"truncated".to_vec());
    let coordinator = coordinator(&site);

    let first = coordinator.ensure_updated().await;
    assert!(matches!(first, UpdateOutcome::InstallFailed(_)), "{first}");
    assert_eq!(coordinator.version_store().read().await, "");

    // Same version, now with a good archive: still installed because nothing was recorded
    site.server.publish_release("v2.0.0", "app-bundle.zip", bundle("fixed"));
    let second = coordinator.ensure_updated().await;
    assert!(second.is_updated(), "{second}");
    assert_eq!(site.read_installed("index.js"), "fixed");
}

#[tokio::test]
async fn test_feed_outage_keeps_installed_bundle_runnable() {
    let site = Site::new().await;
    site.server.publish_release("v1.0.0", "app-bundle.zip", bundle("v1"));
    let coordinator = coordinator(&site);
    assert!(coordinator.ensure_updated().await.is_updated());

    site.server.set_status("/releases/latest", axum::http::StatusCode::BAD_GATEWAY);

    let outcome = coordinator.ensure_updated().await;
    assert!(matches!(
        outcome,
        UpdateOutcome::FetchFailed(LauncherError::FeedStatus { status: 502, .. })
    ));
    assert_eq!(site.read_installed("index.js"), "v1");
    assert_eq!(coordinator.version_store().read().await, "v1.0.0");
}

#[test]
fn test_extraction_round_trip() {
    let temp = tempfile::TempDir::new().unwrap();
    let archive = temp.path().join("fixture.zip");
    ArchiveBuilder::new()
        .file_with_mode("a/b.txt", b"round trip", 0o644)
        .directory("c/")
        .write_to(&archive);

    let dest = temp.path().join("dest");
    std::fs::create_dir(&dest).unwrap();
    extract_archive(&archive, &dest).unwrap();

    assert_eq!(std::fs::read(dest.join("a").join("b.txt")).unwrap(), b"round trip");
    assert!(dest.join("c").is_dir());
    assert_eq!(std::fs::read_dir(dest.join("c")).unwrap().count(), 0);
}
