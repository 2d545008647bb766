//! Runtime configuration for the updater.
//!
//! Every path the pipelines touch — the agentation source checkout, the
//! OpenCode install root, the version-marker file — is carried in
//! [`UpdateConfig`] rather than read from ambient globals. That keeps the
//! pipelines testable against a temporary directory and makes the storage
//! layout a single decision instead of a scatter of hardcoded paths.
//!
//! Defaults live under `~/.agentation`; an optional TOML file can override
//! any field:
//!
//! ```toml
//! source_dir = "/opt/agentation"
//! release_repo = "agentation/opencode"
//! network_timeout_secs = 60
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::UpdaterError;

/// Configuration for one updater run.
///
/// Deserializable from TOML with per-field defaults, so a config file only
/// needs to name the fields it changes.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfig {
    /// Directory holding the agentation git checkout.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Git remote the source pipeline tracks.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Branch on that remote the source pipeline tracks.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Directory under which per-platform OpenCode installations live
    /// (`<install_root>/<artifact>-<platform>/`).
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,

    /// Plain-text file holding the currently installed release tag.
    #[serde(default = "default_version_file")]
    pub version_file: PathBuf,

    /// GitHub `owner/name` repository publishing OpenCode releases.
    #[serde(default = "default_release_repo")]
    pub release_repo: String,

    /// Artifact base name used in release asset and install directory names.
    #[serde(default = "default_artifact_name")]
    pub artifact_name: String,

    /// File whose presence in the source tree triggers a rebuild after pull.
    #[serde(default = "default_build_descriptor")]
    pub build_descriptor: String,

    /// Command run to install build dependencies, argv style.
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    /// Command run to build the source component, argv style.
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,

    /// Timeout applied to feed queries and archive downloads, in seconds.
    #[serde(default = "default_network_timeout_secs")]
    pub network_timeout_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            remote: default_remote(),
            branch: default_branch(),
            install_root: default_install_root(),
            version_file: default_version_file(),
            release_repo: default_release_repo(),
            artifact_name: default_artifact_name(),
            build_descriptor: default_build_descriptor(),
            install_command: default_install_command(),
            build_command: default_build_command(),
            network_timeout_secs: default_network_timeout_secs(),
        }
    }
}

impl UpdateConfig {
    /// Loads configuration from an optional TOML file.
    ///
    /// With no path, returns the defaults. A named file must exist and parse;
    /// a missing or malformed explicit path is a configuration error, not a
    /// silent fallback.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read configuration file: {}", path.display())
        })?;

        let config: Self = toml::from_str(&raw).map_err(|e| UpdaterError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Install directory for a given platform identifier string.
    #[must_use]
    pub fn install_dir_for(&self, platform: &str) -> PathBuf {
        self.install_root.join(format!("{}-{platform}", self.artifact_name))
    }
}

fn home_relative(suffix: &str) -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(suffix)
}

fn default_source_dir() -> PathBuf {
    home_relative(".agentation")
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_install_root() -> PathBuf {
    home_relative(".agentation/opencode")
}

fn default_version_file() -> PathBuf {
    home_relative(".agentation/opencode/.version")
}

fn default_release_repo() -> String {
    "agentation/opencode".to_string()
}

fn default_artifact_name() -> String {
    "opencode".to_string()
}

fn default_build_descriptor() -> String {
    "package.json".to_string()
}

fn default_install_command() -> Vec<String> {
    vec!["npm".to_string(), "install".to_string()]
}

fn default_build_command() -> Vec<String> {
    vec!["npm".to_string(), "run".to_string(), "build".to_string()]
}

fn default_network_timeout_secs() -> u64 {
    30
}
