//! Source update pipeline for the agentation checkout.
//!
//! Brings the local git working tree up to date with its tracked remote
//! branch and rebuilds the component when the source tree carries a build
//! descriptor. The sequencing here is the whole point:
//!
//! 1. fetch (failure is a soft skip — staying on the current local state is
//!    always a safe fallback);
//! 2. compare local and remote heads (equal means up to date unless forced);
//! 3. stash uncommitted changes before mutating anything;
//! 4. pull; on failure pop the stash *before* reporting the failure;
//! 5. install + build if the descriptor is present; same stash rule;
//! 6. pop the stash on the success path.
//!
//! A stash created by a run is popped on every exit path. If the pop itself
//! fails, the changes stay recoverable in git's stash list and the user is
//! told how to get them back — they are never silently discarded.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::core::{UpdateOutcome, UpdaterError};
use crate::git::VersionControl;

/// Label attached to stashes this tool creates, so a stranded stash is
/// recognizable in `git stash list`.
const STASH_LABEL: &str = "agentation-update autostash";

/// Build backend invoked after a successful pull.
///
/// Injected as a trait (like [`VersionControl`]) so tests can verify the
/// pipeline's sequencing without running real package managers.
#[allow(async_fn_in_trait)]
pub trait BuildRunner {
    /// Installs build dependencies in `dir`.
    async fn install(&self, dir: &Path) -> Result<()>;

    /// Builds the component in `dir`.
    async fn build(&self, dir: &Path) -> Result<()>;
}

/// [`BuildRunner`] that executes the configured argv-style commands.
#[derive(Debug, Clone)]
pub struct CommandBuildRunner {
    install_command: Vec<String>,
    build_command: Vec<String>,
    step_timeout: Duration,
}

impl CommandBuildRunner {
    /// Builds a runner from the configured install/build command lines.
    #[must_use]
    pub fn from_config(config: &UpdateConfig) -> Self {
        Self {
            install_command: config.install_command.clone(),
            build_command: config.build_command.clone(),
            // Builds are the slowest thing this tool runs; bound them
            // generously rather than precisely.
            step_timeout: Duration::from_secs(900),
        }
    }

    async fn run_step(&self, step: &str, argv: &[String], dir: &Path) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            debug!("No {step} command configured, skipping");
            return Ok(());
        };

        info!("Running {step}: {}", argv.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = timeout(self.step_timeout, cmd.output())
            .await
            .map_err(|_| UpdaterError::BuildFailed {
                step: step.to_string(),
                reason: format!(
                    "timed out after {} seconds: {}",
                    self.step_timeout.as_secs(),
                    argv.join(" ")
                ),
            })?
            .with_context(|| format!("Failed to execute {step} command: {}", argv.join(" ")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            Err(UpdaterError::BuildFailed {
                step: step.to_string(),
                reason: if stderr.is_empty() {
                    stdout.to_string()
                } else {
                    stderr.to_string()
                },
            }
            .into())
        }
    }
}

impl BuildRunner for CommandBuildRunner {
    async fn install(&self, dir: &Path) -> Result<()> {
        self.run_step("install", &self.install_command, dir).await
    }

    async fn build(&self, dir: &Path) -> Result<()> {
        self.run_step("build", &self.build_command, dir).await
    }
}

/// The source update pipeline.
///
/// Generic over its collaborators so the ordering guarantees are testable
/// with fakes; production wires in [`GitCli`](crate::git::GitCli) and
/// [`CommandBuildRunner`].
pub struct SourceUpdater<'a, V, B> {
    vcs: &'a V,
    build: &'a B,
    config: &'a UpdateConfig,
}

impl<'a, V: VersionControl, B: BuildRunner> SourceUpdater<'a, V, B> {
    /// Wires the pipeline to its collaborators and configuration.
    #[must_use]
    pub const fn new(vcs: &'a V, build: &'a B, config: &'a UpdateConfig) -> Self {
        Self { vcs, build, config }
    }

    /// Runs the pipeline.
    ///
    /// Soft skips come back as `Ok(Skipped)`; operation failures (pull,
    /// build) come back as `Err` after any stash has been restored, and the
    /// caller maps them to [`UpdateOutcome::Failed`].
    pub async fn update(&self, force: bool) -> Result<UpdateOutcome> {
        let dir = &self.config.source_dir;
        let remote = &self.config.remote;
        let branch = &self.config.branch;

        if !self.vcs.is_repository(dir).await {
            warn!(
                "{} is not a git repository, skipping source update",
                dir.display()
            );
            return Ok(UpdateOutcome::Skipped);
        }

        if let Err(e) = self.vcs.fetch(dir, remote, branch).await {
            warn!("Could not fetch {remote}/{branch}, staying on current version: {e:#}");
            return Ok(UpdateOutcome::Skipped);
        }

        let local = self.vcs.current_revision(dir).await?;
        let remote_head = self.vcs.remote_revision(dir, remote, branch).await?;
        debug!("Local revision {local}, remote revision {remote_head}");

        if local == remote_head && !force {
            info!("agentation source is up to date");
            return Ok(UpdateOutcome::UpToDate);
        }

        // Stash before any mutation; from here on every exit path must
        // restore it.
        let mut stashed = false;
        if self.vcs.has_uncommitted_changes(dir).await? {
            info!("Stashing uncommitted local changes");
            self.vcs.stash_push(dir, STASH_LABEL).await?;
            stashed = true;
        }

        if let Err(e) = self.vcs.pull(dir, remote, branch).await {
            self.restore_stash(stashed).await;
            return Err(e);
        }

        if dir.join(&self.config.build_descriptor).exists() {
            if let Err(e) = self.build.install(dir).await {
                self.restore_stash(stashed).await;
                return Err(e);
            }
            if let Err(e) = self.build.build(dir).await {
                self.restore_stash(stashed).await;
                return Err(e);
            }
        } else {
            debug!(
                "No {} in source tree, skipping rebuild",
                self.config.build_descriptor
            );
        }

        self.restore_stash(stashed).await;
        info!("agentation source updated to {remote_head}");
        Ok(UpdateOutcome::Updated)
    }

    /// Pops the stash created by this run, if any.
    ///
    /// A failed pop is reported but not propagated: the changes are still in
    /// git's stash list at that point, so the user can recover them, whereas
    /// propagating here would mask the original pipeline error.
    async fn restore_stash(&self, stashed: bool) {
        if !stashed {
            return;
        }
        info!("Restoring stashed local changes");
        if let Err(e) = self.vcs.stash_pop(&self.config.source_dir).await {
            warn!(
                "Failed to restore stashed changes: {e:#}. Your edits are kept in the \
                 stash list; recover them with `git stash pop` in {}",
                self.config.source_dir.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use tempfile::TempDir;

    type OpLog = Rc<RefCell<Vec<&'static str>>>;

    struct FakeVcs {
        log: OpLog,
        is_repo: bool,
        fetch_ok: bool,
        local: &'static str,
        remote: &'static str,
        dirty: bool,
        pull_ok: bool,
    }

    impl FakeVcs {
        fn clean_with_update(log: OpLog) -> Self {
            Self {
                log,
                is_repo: true,
                fetch_ok: true,
                local: "aaa111",
                remote: "bbb222",
                dirty: false,
                pull_ok: true,
            }
        }
    }

    impl VersionControl for FakeVcs {
        async fn is_repository(&self, _dir: &Path) -> bool {
            self.is_repo
        }

        async fn fetch(&self, _dir: &Path, _remote: &str, _branch: &str) -> Result<()> {
            self.log.borrow_mut().push("fetch");
            if self.fetch_ok {
                Ok(())
            } else {
                Err(anyhow::anyhow!("network unreachable"))
            }
        }

        async fn current_revision(&self, _dir: &Path) -> Result<String> {
            Ok(self.local.to_string())
        }

        async fn remote_revision(&self, _dir: &Path, _remote: &str, _branch: &str) -> Result<String> {
            Ok(self.remote.to_string())
        }

        async fn has_uncommitted_changes(&self, _dir: &Path) -> Result<bool> {
            Ok(self.dirty)
        }

        async fn stash_push(&self, _dir: &Path, _label: &str) -> Result<()> {
            self.log.borrow_mut().push("stash_push");
            Ok(())
        }

        async fn stash_pop(&self, _dir: &Path) -> Result<()> {
            self.log.borrow_mut().push("stash_pop");
            Ok(())
        }

        async fn pull(&self, _dir: &Path, _remote: &str, _branch: &str) -> Result<()> {
            self.log.borrow_mut().push("pull");
            if self.pull_ok {
                Ok(())
            } else {
                Err(UpdaterError::GitCommandError {
                    operation: "pull".to_string(),
                    stderr: "merge conflict".to_string(),
                }
                .into())
            }
        }
    }

    struct FakeBuild {
        log: OpLog,
        install_ok: bool,
        build_ok: bool,
    }

    impl BuildRunner for FakeBuild {
        async fn install(&self, _dir: &Path) -> Result<()> {
            self.log.borrow_mut().push("install");
            if self.install_ok {
                Ok(())
            } else {
                Err(UpdaterError::BuildFailed {
                    step: "install".to_string(),
                    reason: "registry down".to_string(),
                }
                .into())
            }
        }

        async fn build(&self, _dir: &Path) -> Result<()> {
            self.log.borrow_mut().push("build");
            if self.build_ok {
                Ok(())
            } else {
                Err(UpdaterError::BuildFailed {
                    step: "build".to_string(),
                    reason: "type error".to_string(),
                }
                .into())
            }
        }
    }

    fn test_config(source_dir: PathBuf) -> UpdateConfig {
        UpdateConfig {
            source_dir,
            ..Default::default()
        }
    }

    fn passing_build(log: OpLog) -> FakeBuild {
        FakeBuild {
            log,
            install_ok: true,
            build_ok: true,
        }
    }

    fn count(log: &OpLog, op: &str) -> usize {
        log.borrow().iter().filter(|entry| **entry == op).count()
    }

    #[tokio::test]
    async fn test_not_a_repository_skips_without_mutation() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs {
            is_repo: false,
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let outcome = SourceUpdater::new(&vcs, &build, &config).update(false).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::Skipped);
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_a_soft_skip() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs {
            fetch_ok: false,
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let outcome = SourceUpdater::new(&vcs, &build, &config).update(false).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::Skipped);
        assert_eq!(*log.borrow(), vec!["fetch"]);
    }

    #[tokio::test]
    async fn test_equal_revisions_report_up_to_date_without_mutation() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs {
            local: "aaa111",
            remote: "aaa111",
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let outcome = SourceUpdater::new(&vcs, &build, &config).update(false).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::UpToDate);
        assert_eq!(*log.borrow(), vec!["fetch"]);
    }

    #[tokio::test]
    async fn test_force_bypasses_up_to_date_short_circuit() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs {
            local: "aaa111",
            remote: "aaa111",
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let outcome = SourceUpdater::new(&vcs, &build, &config).update(true).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert!(log.borrow().contains(&"pull"));
    }

    #[tokio::test]
    async fn test_clean_tree_without_descriptor_updates_without_stash_or_build() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs::clean_with_update(log.clone());
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let outcome = SourceUpdater::new(&vcs, &build, &config).update(false).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(*log.borrow(), vec!["fetch", "pull"]);
    }

    #[tokio::test]
    async fn test_dirty_tree_with_descriptor_runs_full_sequence_in_order() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        let vcs = FakeVcs {
            dirty: true,
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let outcome = SourceUpdater::new(&vcs, &build, &config).update(false).await.unwrap();

        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(
            *log.borrow(),
            vec!["fetch", "stash_push", "pull", "install", "build", "stash_pop"]
        );
    }

    #[tokio::test]
    async fn test_pull_failure_pops_stash_exactly_once() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs {
            dirty: true,
            pull_ok: false,
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let result = SourceUpdater::new(&vcs, &build, &config).update(false).await;

        assert!(result.is_err());
        assert_eq!(count(&log, "stash_push"), 1);
        assert_eq!(count(&log, "stash_pop"), 1);
    }

    #[tokio::test]
    async fn test_build_failure_pops_stash_exactly_once() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        let vcs = FakeVcs {
            dirty: true,
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = FakeBuild {
            log: log.clone(),
            install_ok: true,
            build_ok: false,
        };
        let config = test_config(temp.path().to_path_buf());

        let result = SourceUpdater::new(&vcs, &build, &config).update(false).await;

        assert!(result.is_err());
        assert_eq!(
            *log.borrow(),
            vec!["fetch", "stash_push", "pull", "install", "build", "stash_pop"]
        );
    }

    #[tokio::test]
    async fn test_install_failure_pops_stash_before_reporting() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        let vcs = FakeVcs {
            dirty: true,
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = FakeBuild {
            log: log.clone(),
            install_ok: false,
            build_ok: true,
        };
        let config = test_config(temp.path().to_path_buf());

        let result = SourceUpdater::new(&vcs, &build, &config).update(false).await;

        assert!(result.is_err());
        assert_eq!(count(&log, "stash_pop"), 1);
        assert_eq!(count(&log, "build"), 0);
    }

    #[tokio::test]
    async fn test_clean_tree_failure_paths_never_touch_the_stash() {
        let log: OpLog = Rc::default();
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs {
            pull_ok: false,
            ..FakeVcs::clean_with_update(log.clone())
        };
        let build = passing_build(log.clone());
        let config = test_config(temp.path().to_path_buf());

        let result = SourceUpdater::new(&vcs, &build, &config).update(false).await;

        assert!(result.is_err());
        assert_eq!(count(&log, "stash_push"), 0);
        assert_eq!(count(&log, "stash_pop"), 0);
    }

    #[tokio::test]
    async fn test_command_build_runner_reports_nonzero_exit() {
        let temp = TempDir::new().unwrap();
        let runner = CommandBuildRunner {
            install_command: vec!["false".to_string()],
            build_command: vec!["true".to_string()],
            step_timeout: Duration::from_secs(10),
        };

        let result = runner.install(temp.path()).await;
        assert!(result.is_err());

        let result = runner.build(temp.path()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_command_build_runner_empty_command_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let runner = CommandBuildRunner {
            install_command: vec![],
            build_command: vec![],
            step_timeout: Duration::from_secs(10),
        };
        assert!(runner.install(temp.path()).await.is_ok());
        assert!(runner.build(temp.path()).await.is_ok());
    }
}
