//! Type-safe git command builder for consistent command execution.
//!
//! Provides a fluent API for building and executing the handful of git
//! commands the source pipeline consumes, with unified timeout handling,
//! output capture, and error conversion.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::UpdaterError;

/// Platform-appropriate git executable name.
#[must_use]
pub const fn git_program() -> &'static str {
    if cfg!(windows) { "git.exe" } else { "git" }
}

/// Builder for constructing and executing git commands.
///
/// Every invocation goes through the same path: arguments are assembled with
/// an optional `-C <dir>` prefix so commands are independent of the process
/// working directory, output is captured, and the whole execution is bounded
/// by a timeout so a stalled remote can never hang the updater.
///
/// # Examples
///
/// ```rust,no_run
/// use agentation_update::git::GitCommand;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let head = GitCommand::rev_parse("HEAD")
///     .current_dir(Path::new("/path/to/repo"))
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GitCommand {
    /// Arguments passed to git, excluding the `-C` prefix.
    args: Vec<String>,
    /// Repository directory, passed via `-C`.
    current_dir: Option<std::path::PathBuf>,
    /// Maximum duration to wait for completion.
    timeout_duration: Option<Duration>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // 5 minutes covers fetch and pull against slow remotes.
            timeout_duration: Some(Duration::from_secs(300)),
        }
    }
}

impl GitCommand {
    /// Creates a builder with default settings (5-minute timeout, captured
    /// output, process working directory).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the repository directory the command runs against.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overrides the execution timeout (`None` disables it).
    #[must_use]
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Executes the command, returning captured stdout/stderr.
    ///
    /// Non-zero exit and timeout both surface as
    /// [`UpdaterError::GitCommandError`] naming the git subcommand.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let program = git_program();
        let mut cmd = Command::new(program);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            // -C keeps git operations independent of the process cwd, and
            // avoids symlink resolution differences on macOS (/var vs
            // /private/var).
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());

        cmd.args(&full_args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(target: "git", "Executing command: {} {}", program, full_args.join(" "));

        let operation = self.operation_name(&full_args);
        let output_future = cmd.output();

        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result
                    .context(format!("Failed to execute git {}", full_args.join(" ")))?,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(UpdaterError::GitCommandError {
                        operation,
                        stderr: format!(
                            "git command timed out after {} seconds. This may indicate \
                             network connectivity issues or an authentication prompt \
                             waiting for input. Try running manually: git {}",
                            duration.as_secs(),
                            full_args.join(" ")
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future
                .await
                .context(format!("Failed to execute git {}", full_args.join(" ")))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);

            tracing::debug!(
                target: "git",
                "Command failed with exit code: {:?}",
                output.status.code()
            );

            return Err(UpdaterError::GitCommandError {
                operation,
                stderr: if stderr.is_empty() {
                    stdout.to_string()
                } else {
                    stderr.to_string()
                },
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.is_empty() {
            tracing::debug!(target: "git", "{}", stdout.trim());
        }
        if !stderr.is_empty() {
            tracing::debug!(target: "git", "{}", stderr.trim());
        }

        Ok(GitCommandOutput { stdout, stderr })
    }

    /// Executes and returns trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Executes and checks for success, discarding output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    /// The git subcommand for error reporting, skipping any `-C <dir>`.
    fn operation_name(&self, full_args: &[String]) -> String {
        let start = if full_args.first().map(String::as_str) == Some("-C") && full_args.len() > 2 {
            2
        } else {
            0
        };
        full_args.get(start).cloned().unwrap_or_else(|| "unknown".to_string())
    }
}

/// Captured output from a git command.
pub struct GitCommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

// Convenience builders for the operations the source pipeline consumes.

impl GitCommand {
    /// `git fetch <remote> <branch>`.
    #[must_use]
    pub fn fetch(remote: &str, branch: &str) -> Self {
        Self::new().args(["fetch", remote, branch])
    }

    /// `git rev-parse <ref>`.
    #[must_use]
    pub fn rev_parse(ref_name: &str) -> Self {
        Self::new().args(["rev-parse", ref_name])
    }

    /// `git rev-parse --git-dir`, used as the is-this-a-repository probe.
    #[must_use]
    pub fn git_dir() -> Self {
        Self::new().args(["rev-parse", "--git-dir"])
    }

    /// `git status --porcelain`, empty output means a clean tree.
    #[must_use]
    pub fn status_porcelain() -> Self {
        Self::new().args(["status", "--porcelain"])
    }

    /// `git stash push -u -m <label>`; `-u` shelves untracked files too.
    #[must_use]
    pub fn stash_push(label: &str) -> Self {
        Self::new().args(["stash", "push", "-u", "-m", label])
    }

    /// `git stash pop`.
    #[must_use]
    pub fn stash_pop() -> Self {
        Self::new().args(["stash", "pop"])
    }

    /// `git pull <remote> <branch>`.
    #[must_use]
    pub fn pull(remote: &str, branch: &str) -> Self {
        Self::new().args(["pull", remote, branch])
    }
}
