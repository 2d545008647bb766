//! Error handling for agentation-update.
//!
//! Two layers, following the same split the rest of the codebase relies on:
//!
//! 1. [`UpdaterError`] — strongly-typed variants for every operation failure
//!    the pipelines can hit (git, build, download, archive). These all mean
//!    something was attempted and broke.
//! 2. [`ErrorContext`] — a display wrapper that adds an actionable suggestion
//!    and optional details, used by the CLI to print colored errors to
//!    stderr. Use [`user_friendly_error`] to convert any [`anyhow::Error`]
//!    into one.
//!
//! Soft skips (not a repository, unknown platform, unreachable feed) are
//! deliberately *not* errors: the pipelines log a warning and report
//! [`UpdateOutcome::Skipped`](crate::core::UpdateOutcome::Skipped) without
//! ever constructing an `UpdaterError`. Keeping the two categories in
//! different channels is what lets callers and tests tell them apart.
//!
//! # Examples
//!
//! ```rust,no_run
//! use agentation_update::core::{UpdaterError, user_friendly_error};
//!
//! let err = UpdaterError::GitNotFound;
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display(); // colored error + suggestion on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Typed errors for update operations that were attempted and failed.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// Git is not installed or not on PATH.
    #[error("git is not installed or not found in PATH")]
    GitNotFound,

    /// A git subcommand exited non-zero or timed out.
    #[error("git operation failed: {operation}")]
    GitCommandError {
        /// The git subcommand that failed (e.g. `pull`, `stash`).
        operation: String,
        /// Captured stderr from the git process.
        stderr: String,
    },

    /// The rebuild step (dependency install or build) exited non-zero.
    #[error("build step '{step}' failed")]
    BuildFailed {
        /// Which step broke: `install` or `build`.
        step: String,
        /// Captured process output or spawn error.
        reason: String,
    },

    /// The release archive could not be downloaded. The previous
    /// installation is untouched when this is raised: nothing is removed
    /// before the download completes.
    #[error("failed to download release archive from {url}")]
    DownloadFailed {
        /// The asset URL that was requested.
        url: String,
        /// Transport-level failure description.
        reason: String,
    },

    /// The downloaded archive could not be unpacked.
    #[error("failed to extract archive {path}")]
    ArchiveError {
        /// Path of the staged archive file.
        path: String,
        /// Extraction failure description.
        reason: String,
    },

    /// Configuration file was present but invalid.
    #[error("configuration error: {message}")]
    ConfigError {
        /// What was wrong with the configuration.
        message: String,
    },

    /// Wrapped I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wrapped TOML parse error from the config file.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Catch-all for errors without a dedicated variant.
    #[error("{message}")]
    Other {
        /// The error description.
        message: String,
    },
}

/// A displayable error with an optional suggestion and details.
///
/// The CLI's terminal presentation of an error: the message in red, details
/// in yellow, suggestion in green, all on stderr. Quiet mode never suppresses
/// this output.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying typed error.
    pub error: UpdaterError,
    /// Actionable step the user can take, shown in green.
    pub suggestion: Option<String>,
    /// Extra context about why the error occurred, shown in yellow.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wraps a typed error with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Adds an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds explanatory details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with a tailored suggestion.
///
/// Recognizes [`UpdaterError`] variants and common I/O errors; anything else
/// gets the full error chain appended so nothing is silently dropped.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(updater_error) = error.downcast_ref::<UpdaterError>() {
        return contextualize(updater_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(UpdaterError::Other {
                    message: error.to_string(),
                })
                .with_suggestion(
                    "Check file ownership of the install directory, or re-run with the \
                     permissions the original installation used",
                );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(UpdaterError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the configured paths exist and are spelled correctly");
            }
            _ => {}
        }
    }

    // Generic error: keep the whole chain so the root cause is visible.
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(|cause| cause.to_string()).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {cause}", i + 1));
        }
    }

    ErrorContext::new(UpdaterError::Other { message })
}

fn contextualize(error: &UpdaterError) -> ErrorContext {
    match error {
        UpdaterError::GitNotFound => ErrorContext::new(UpdaterError::GitNotFound)
            .with_suggestion("Install git from https://git-scm.com/ or via your package manager")
            .with_details("The source pipeline drives git for fetch, pull, and stash operations"),

        UpdaterError::GitCommandError { operation, stderr } => {
            ErrorContext::new(UpdaterError::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            })
            .with_details(stderr.trim().to_string())
            .with_suggestion(format!(
                "Run `git {operation}` manually in the source directory to inspect the failure"
            ))
        }

        UpdaterError::BuildFailed { step, reason } => {
            ErrorContext::new(UpdaterError::BuildFailed {
                step: step.clone(),
                reason: reason.clone(),
            })
            .with_details(reason.trim().to_string())
            .with_suggestion(
                "Run the build manually in the source directory; local edits were restored \
                 from the stash before this error was reported",
            )
        }

        UpdaterError::DownloadFailed { url, reason } => {
            ErrorContext::new(UpdaterError::DownloadFailed {
                url: url.clone(),
                reason: reason.clone(),
            })
            .with_details(reason.clone())
            .with_suggestion(
                "Check network connectivity and retry; the previous installation is untouched",
            )
        }

        UpdaterError::ArchiveError { path, reason } => {
            ErrorContext::new(UpdaterError::ArchiveError {
                path: path.clone(),
                reason: reason.clone(),
            })
            .with_details(reason.clone())
            .with_suggestion("Retry with --force to download a fresh archive")
        }

        UpdaterError::ConfigError { message } => ErrorContext::new(UpdaterError::ConfigError {
            message: message.clone(),
        })
        .with_suggestion("Check the TOML syntax of the configuration file"),

        UpdaterError::IoError(io_error) => ErrorContext::new(UpdaterError::Other {
            message: io_error.to_string(),
        }),

        UpdaterError::TomlError(toml_error) => ErrorContext::new(UpdaterError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the configuration file"),

        UpdaterError::Other { message } => ErrorContext::new(UpdaterError::Other {
            message: message.clone(),
        }),
    }
}
