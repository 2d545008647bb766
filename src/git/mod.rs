//! Version-control backend for the source pipeline.
//!
//! The pipeline consumes a small, fixed set of operations — fetch, revision
//! queries, dirtiness check, stash push/pop, pull — expressed as the
//! [`VersionControl`] trait so tests can substitute a recording fake without
//! invoking real git. [`GitCli`] is the production implementation, driving
//! the system `git` binary through [`GitCommand`].

pub mod command_builder;

pub use command_builder::{GitCommand, GitCommandOutput};

use anyhow::Result;
use std::path::Path;

use crate::core::UpdaterError;

/// Operations the source pipeline consumes from version control.
///
/// All operations are scoped to an explicit repository directory; nothing
/// depends on the process working directory.
#[allow(async_fn_in_trait)]
pub trait VersionControl {
    /// `true` if `dir` is inside a git working tree.
    async fn is_repository(&self, dir: &Path) -> bool;

    /// Fetches `branch` from `remote`. Network and auth failures surface as
    /// errors; the caller decides whether they are soft.
    async fn fetch(&self, dir: &Path, remote: &str, branch: &str) -> Result<()>;

    /// Revision id of local `HEAD`.
    async fn current_revision(&self, dir: &Path) -> Result<String>;

    /// Revision id of the fetched remote branch head.
    async fn remote_revision(&self, dir: &Path, remote: &str, branch: &str) -> Result<String>;

    /// `true` if the working tree has uncommitted (or untracked) changes.
    async fn has_uncommitted_changes(&self, dir: &Path) -> Result<bool>;

    /// Shelves uncommitted changes under `label`.
    async fn stash_push(&self, dir: &Path, label: &str) -> Result<()>;

    /// Restores the most recently shelved changes.
    async fn stash_pop(&self, dir: &Path) -> Result<()>;

    /// Merges the fetched remote branch into the local branch.
    async fn pull(&self, dir: &Path, remote: &str, branch: &str) -> Result<()>;
}

/// Production [`VersionControl`] backed by the system git binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    /// Creates the git-backed implementation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Verifies git is installed and on PATH.
    pub fn ensure_installed() -> Result<()> {
        if which::which(command_builder::git_program()).is_ok() {
            Ok(())
        } else {
            Err(UpdaterError::GitNotFound.into())
        }
    }
}

impl VersionControl for GitCli {
    async fn is_repository(&self, dir: &Path) -> bool {
        if !dir.is_dir() {
            return false;
        }
        GitCommand::git_dir().current_dir(dir).execute_success().await.is_ok()
    }

    async fn fetch(&self, dir: &Path, remote: &str, branch: &str) -> Result<()> {
        GitCommand::fetch(remote, branch).current_dir(dir).execute_success().await
    }

    async fn current_revision(&self, dir: &Path) -> Result<String> {
        GitCommand::rev_parse("HEAD").current_dir(dir).execute_stdout().await
    }

    async fn remote_revision(&self, dir: &Path, remote: &str, branch: &str) -> Result<String> {
        GitCommand::rev_parse(&format!("{remote}/{branch}"))
            .current_dir(dir)
            .execute_stdout()
            .await
    }

    async fn has_uncommitted_changes(&self, dir: &Path) -> Result<bool> {
        let status = GitCommand::status_porcelain().current_dir(dir).execute_stdout().await?;
        Ok(!status.is_empty())
    }

    async fn stash_push(&self, dir: &Path, label: &str) -> Result<()> {
        GitCommand::stash_push(label).current_dir(dir).execute_success().await
    }

    async fn stash_pop(&self, dir: &Path) -> Result<()> {
        GitCommand::stash_pop().current_dir(dir).execute_success().await
    }

    async fn pull(&self, dir: &Path, remote: &str, branch: &str) -> Result<()> {
        GitCommand::pull(remote, branch).current_dir(dir).execute_success().await
    }
}
