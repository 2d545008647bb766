//! Release update pipeline for the OpenCode binary.
//!
//! Keeps a per-platform prebuilt installation in sync with the latest GitHub
//! release. The pipeline compares the locally recorded release tag against
//! the feed and, when they differ, replaces the installation with the freshly
//! downloaded archive. The swap is ordered so the previous installation is
//! only removed after the new archive has fully downloaded: a failed or
//! interrupted download leaves the existing binaries untouched.
//!
//! Hosts with no published artifact never fail the run. An unrecognized
//! platform and Intel macOS (which ships no prebuilt binary) are both
//! detected before any network traffic and reported as skips.

pub mod archive;
pub mod feed;
pub mod marker;

pub use archive::{ArchiveKind, ArchiveTransport, HttpTransport, asset_name, asset_url};
pub use feed::{GithubReleaseFeed, ReleaseFeed};
pub use marker::{UNKNOWN_VERSION, VersionMarker};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::core::UpdateOutcome;
use crate::platform::PlatformId;

/// The release update pipeline.
///
/// Generic over the feed and transport so the swap ordering is testable
/// against temp directories; production wires in [`GithubReleaseFeed`] and
/// [`HttpTransport`].
pub struct ReleaseUpdater<'a, F, T> {
    feed: &'a F,
    transport: &'a T,
    config: &'a UpdateConfig,
}

impl<'a, F: ReleaseFeed, T: ArchiveTransport> ReleaseUpdater<'a, F, T> {
    /// Wires the pipeline to its collaborators and configuration.
    #[must_use]
    pub const fn new(feed: &'a F, transport: &'a T, config: &'a UpdateConfig) -> Self {
        Self { feed, transport, config }
    }

    /// Runs the pipeline for the resolved host platform.
    ///
    /// Soft skips come back as `Ok(Skipped)`; download and extraction
    /// failures come back as `Err` with the previous installation intact.
    pub async fn update(&self, platform: PlatformId, force: bool) -> Result<UpdateOutcome> {
        if platform.is_unknown() {
            warn!("No prebuilt OpenCode binaries for platform {platform}, skipping");
            return Ok(UpdateOutcome::Skipped);
        }
        if platform.is_unsupported() {
            warn!(
                "OpenCode does not publish binaries for {platform}; \
                 build from source to run on Intel macOS"
            );
            return Ok(UpdateOutcome::Skipped);
        }

        let latest = match self.feed.latest_tag().await {
            Ok(Some(tag)) => tag,
            Ok(None) => {
                warn!(
                    "No releases published for {}, keeping current version",
                    self.config.release_repo
                );
                return Ok(UpdateOutcome::Skipped);
            }
            Err(e) => {
                warn!("Could not reach the release feed, keeping current version: {e:#}");
                return Ok(UpdateOutcome::Skipped);
            }
        };

        let marker = VersionMarker::new(&self.config.version_file);
        let installed = marker.load();
        debug!("Installed release {installed}, latest release {latest}");

        if installed == latest && !force {
            info!("OpenCode is up to date ({latest})");
            return Ok(UpdateOutcome::UpToDate);
        }

        self.install(platform, &latest).await?;
        marker.store(&latest)?;

        info!("OpenCode updated to {latest}");
        Ok(UpdateOutcome::Updated)
    }

    /// Downloads and swaps in the release `tag`.
    ///
    /// The existing install directory is removed only after the archive has
    /// fully downloaded, so any failure up to that point leaves the previous
    /// installation usable.
    async fn install(&self, platform: PlatformId, tag: &str) -> Result<()> {
        let file_name = asset_name(&self.config.artifact_name, platform);
        let url = asset_url(&self.config.release_repo, tag, &file_name);
        let archive_path = self.config.install_root.join(&file_name);

        info!("Downloading OpenCode {tag} for {platform}");
        self.transport.download(&url, &archive_path).await?;

        let install_dir = self.config.install_dir_for(&platform.to_string());
        if install_dir.exists() {
            debug!("Removing previous installation: {}", install_dir.display());
            tokio::fs::remove_dir_all(&install_dir).await.with_context(|| {
                format!("Failed to remove previous installation: {}", install_dir.display())
            })?;
        }

        archive::extract(&archive_path, ArchiveKind::for_platform(platform), &install_dir)?;

        // The archive has served its purpose; a leftover is clutter, not a
        // failure.
        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            warn!("Could not remove downloaded archive {}: {e}", archive_path.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct FakeFeed {
        calls: Cell<usize>,
        result: Result<Option<String>, String>,
    }

    impl FakeFeed {
        fn with_tag(tag: &str) -> Self {
            Self {
                calls: Cell::new(0),
                result: Ok(Some(tag.to_string())),
            }
        }
    }

    impl ReleaseFeed for FakeFeed {
        async fn latest_tag(&self) -> Result<Option<String>> {
            self.calls.set(self.calls.get() + 1);
            match &self.result {
                Ok(tag) => Ok(tag.clone()),
                Err(message) => Err(anyhow::anyhow!("{message}")),
            }
        }
    }

    /// Transport that writes a real tar.gz with a single `opencode` entry,
    /// or fails without touching the destination.
    struct FakeTransport {
        payload: Option<&'static [u8]>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn serving(payload: &'static [u8]) -> Self {
            Self {
                payload: Some(payload),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                payload: None,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl ArchiveTransport for FakeTransport {
        async fn download(&self, url: &str, dest: &Path) -> Result<()> {
            self.requests.borrow_mut().push(url.to_string());
            let Some(payload) = self.payload else {
                return Err(anyhow::anyhow!("connection reset"));
            };

            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            let file = std::fs::File::create(dest).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_size(payload.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, "opencode", payload).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
            Ok(())
        }
    }

    fn test_config(root: &Path) -> UpdateConfig {
        UpdateConfig {
            install_root: root.to_path_buf(),
            version_file: root.join(".version"),
            ..Default::default()
        }
    }

    fn linux() -> PlatformId {
        PlatformId::from_host("Linux", "x86_64")
    }

    fn install_dir(config: &UpdateConfig) -> PathBuf {
        config.install_dir_for("linux-x64")
    }

    #[tokio::test]
    async fn test_unknown_platform_skips_before_any_network_call() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v1.0.0");
        let transport = FakeTransport::failing();
        let config = test_config(temp.path());

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(PlatformId::from_host("Plan9", "sparc64"), false)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Skipped);
        assert_eq!(feed.calls.get(), 0);
        assert!(transport.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_intel_macos_skips_before_any_network_call() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v1.0.0");
        let transport = FakeTransport::failing();
        let config = test_config(temp.path());

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(PlatformId::from_host("Darwin", "x86_64"), false)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Skipped);
        assert_eq!(feed.calls.get(), 0);
        assert!(transport.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_a_soft_skip() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed {
            calls: Cell::new(0),
            result: Err("dns failure".to_string()),
        };
        let transport = FakeTransport::failing();
        let config = test_config(temp.path());

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(linux(), false)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Skipped);
        assert!(transport.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_feed_without_releases_is_a_soft_skip() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed {
            calls: Cell::new(0),
            result: Ok(None),
        };
        let transport = FakeTransport::failing();
        let config = test_config(temp.path());

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(linux(), false)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_matching_marker_reports_up_to_date_without_download() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v1.0.0");
        let transport = FakeTransport::failing();
        let config = test_config(temp.path());
        VersionMarker::new(&config.version_file).store("v1.0.0").unwrap();

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(linux(), false)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::UpToDate);
        assert!(transport.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_install_downloads_extracts_and_records_version() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v1.0.0");
        let transport = FakeTransport::serving(b"opencode binary");
        let config = test_config(temp.path());

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(linux(), false)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(
            transport.requests.borrow().as_slice(),
            ["https://github.com/agentation/opencode/releases/download/v1.0.0/opencode-linux-x64.tar.gz"]
        );
        let binary = install_dir(&config).join("opencode");
        assert_eq!(std::fs::read(binary).unwrap(), b"opencode binary");
        assert_eq!(VersionMarker::new(&config.version_file).load(), "v1.0.0");
        // The downloaded archive is cleaned up after extraction.
        assert!(!temp.path().join("opencode-linux-x64.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_upgrade_replaces_previous_installation() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v2.0.0");
        let transport = FakeTransport::serving(b"new binary");
        let config = test_config(temp.path());

        let old_dir = install_dir(&config);
        std::fs::create_dir_all(&old_dir).unwrap();
        std::fs::write(old_dir.join("stale-helper"), b"old").unwrap();
        VersionMarker::new(&config.version_file).store("v1.0.0").unwrap();

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(linux(), false)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert!(!old_dir.join("stale-helper").exists());
        assert_eq!(std::fs::read(old_dir.join("opencode")).unwrap(), b"new binary");
        assert_eq!(VersionMarker::new(&config.version_file).load(), "v2.0.0");
    }

    #[tokio::test]
    async fn test_failed_download_leaves_previous_installation_untouched() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v2.0.0");
        let transport = FakeTransport::failing();
        let config = test_config(temp.path());

        let old_dir = install_dir(&config);
        std::fs::create_dir_all(&old_dir).unwrap();
        std::fs::write(old_dir.join("opencode"), b"old binary").unwrap();
        VersionMarker::new(&config.version_file).store("v1.0.0").unwrap();

        let result = ReleaseUpdater::new(&feed, &transport, &config)
            .update(linux(), false)
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(old_dir.join("opencode")).unwrap(), b"old binary");
        assert_eq!(VersionMarker::new(&config.version_file).load(), "v1.0.0");
    }

    #[tokio::test]
    async fn test_force_reinstalls_the_current_version() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v1.0.0");
        let transport = FakeTransport::serving(b"same binary");
        let config = test_config(temp.path());
        VersionMarker::new(&config.version_file).store("v1.0.0").unwrap();

        let outcome = ReleaseUpdater::new(&feed, &transport, &config)
            .update(linux(), true)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(transport.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_up_to_date() {
        let temp = TempDir::new().unwrap();
        let feed = FakeFeed::with_tag("v1.0.0");
        let transport = FakeTransport::serving(b"opencode binary");
        let config = test_config(temp.path());

        let updater = ReleaseUpdater::new(&feed, &transport, &config);
        assert_eq!(updater.update(linux(), false).await.unwrap(), UpdateOutcome::Updated);
        assert_eq!(updater.update(linux(), false).await.unwrap(), UpdateOutcome::UpToDate);
        assert_eq!(transport.requests.borrow().len(), 1);
    }
}
