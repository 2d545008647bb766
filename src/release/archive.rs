//! Release archive naming, download, and extraction.
//!
//! Release assets are named `<artifact>-<os>-<arch>.<ext>`, where the
//! extension follows the platform convention: `.zip` on Windows, `.tar.gz`
//! everywhere else. Downloads go through the [`ArchiveTransport`] trait so
//! the pipeline's swap ordering can be tested with a fake that writes real
//! archives into a temp directory.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::core::UpdaterError;
use crate::platform::{Os, PlatformId};

/// Archive container format of a release asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.zip`, used for Windows assets.
    Zip,
    /// `.tar.gz`, used for Linux and macOS assets.
    TarGz,
}

impl ArchiveKind {
    /// The kind used for assets targeting `platform`.
    #[must_use]
    pub const fn for_platform(platform: PlatformId) -> Self {
        match platform.os {
            Os::Windows => Self::Zip,
            _ => Self::TarGz,
        }
    }

    /// File extension including the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::TarGz => ".tar.gz",
        }
    }
}

/// Asset file name for an artifact on a platform, e.g.
/// `opencode-linux-x64.tar.gz`.
#[must_use]
pub fn asset_name(artifact: &str, platform: PlatformId) -> String {
    format!(
        "{artifact}-{platform}{}",
        ArchiveKind::for_platform(platform).extension()
    )
}

/// Download URL for a release asset on a GitHub repository.
#[must_use]
pub fn asset_url(repo: &str, tag: &str, file_name: &str) -> String {
    format!("https://github.com/{repo}/releases/download/{tag}/{file_name}")
}

/// Fetches a release archive to a local path.
#[allow(async_fn_in_trait)]
pub trait ArchiveTransport {
    /// Downloads `url` into `dest`, replacing any existing file.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// [`ArchiveTransport`] backed by an HTTP client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl ArchiveTransport for HttpTransport {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Downloading {url} to {}", dest.display());

        let response = self.client.get(url).send().await.map_err(|e| {
            UpdaterError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(UpdaterError::DownloadFailed {
                url: url.to_string(),
                reason: format!("server returned {}", response.status()),
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(|e| UpdaterError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create directory: {}", parent.display())
            })?;
        }
        tokio::fs::write(dest, &bytes)
            .await
            .with_context(|| format!("Failed to write download: {}", dest.display()))?;

        Ok(())
    }
}

/// Extracts an archive of the given kind into `dest`.
pub fn extract(archive_path: &Path, kind: ArchiveKind, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory: {}", dest.display()))?;
    match kind {
        ArchiveKind::Zip => extract_zip(archive_path, dest),
        ArchiveKind::TarGz => extract_tar_gz(archive_path, dest),
    }
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| UpdaterError::ArchiveError {
        path: archive_path.display().to_string(),
        reason: e.to_string(),
    })?;
    archive.extract(dest).map_err(|e| {
        UpdaterError::ArchiveError {
            path: archive_path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let decoder = GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest).map_err(|e| {
        UpdaterError::ArchiveError {
            path: archive_path.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
