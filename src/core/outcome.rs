//! Per-pipeline update outcomes and the combined run report.
//!
//! Each pipeline reports exactly one [`UpdateOutcome`]. The distinction
//! between `Skipped` and `Failed` carries the error taxonomy: a skip is a
//! precondition that was not met (not a repository, unknown platform,
//! unreachable network) and leaves the run successful; a failure is an
//! operation that started and did not complete (pull, build, download) and
//! fails the run.

use std::fmt;

/// Result of one update pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A precondition was not met; nothing was attempted. Counts as success.
    Skipped,
    /// Local state already matches upstream; nothing to do.
    UpToDate,
    /// Upstream state was applied successfully.
    Updated,
    /// An operation was attempted and failed. Fails the combined run.
    Failed,
}

impl UpdateOutcome {
    /// `true` only for [`UpdateOutcome::Failed`]; `Skipped` and `UpToDate`
    /// both count as success for exit-code purposes.
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Short lowercase label for log lines and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::UpToDate => "up to date",
            Self::Updated => "updated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated result of one orchestrator run.
///
/// The two pipelines operate on disjoint resources and are reported
/// independently; the combined exit status is success iff neither failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Outcome of the source (git pull + rebuild) pipeline.
    pub source: UpdateOutcome,
    /// Outcome of the release (binary download) pipeline.
    pub release: UpdateOutcome,
}

impl RunReport {
    /// `true` iff neither pipeline reported `Failed`.
    #[must_use]
    pub const fn success(&self) -> bool {
        !self.source.is_failed() && !self.release.is_failed()
    }

    /// Process exit code: `0` on combined success, `1` otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }
}
