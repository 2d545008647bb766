//! Version marker persistence.
//!
//! The installed OpenCode release is tracked by a plain-text file holding the
//! release tag. An absent or unreadable marker reads as the sentinel
//! [`UNKNOWN_VERSION`], which never equals a real tag, so the pipeline treats
//! a fresh host as "update needed" rather than an error.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Sentinel returned when no marker exists yet.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Plain-text marker file holding the installed release tag.
#[derive(Debug, Clone)]
pub struct VersionMarker {
    path: PathBuf,
}

impl VersionMarker {
    /// Binds the marker to its on-disk path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the marker file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the installed tag, or [`UNKNOWN_VERSION`] when the marker is
    /// absent or unreadable. Never fails: a missing marker just means the
    /// next comparison won't match and an update will run.
    #[must_use]
    pub fn load(&self) -> String {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let tag = raw.trim();
                if tag.is_empty() {
                    UNKNOWN_VERSION.to_string()
                } else {
                    tag.to_string()
                }
            }
            Err(_) => UNKNOWN_VERSION.to_string(),
        }
    }

    /// Persists `tag` as the installed release.
    ///
    /// Called only after an install fully succeeds, so the marker never gets
    /// ahead of the binaries on disk.
    pub fn store(&self, tag: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.path, format!("{tag}\n"))
            .with_context(|| format!("Failed to write version marker: {}", self.path.display()))
    }
}
