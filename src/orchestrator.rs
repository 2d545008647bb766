//! Runs the two update pipelines and aggregates their outcomes.
//!
//! The source checkout and the OpenCode installation are disjoint resources,
//! so the pipelines run independently: a failure in one never prevents the
//! other from running, and each reports its own [`UpdateOutcome`]. Errors are
//! rendered to stderr here, at the boundary, and folded into the report as
//! `Failed` rather than propagated.

use tracing::info;

use crate::config::UpdateConfig;
use crate::core::{RunReport, UpdateOutcome, user_friendly_error};
use crate::git::GitCli;
use crate::platform;
use crate::release::{GithubReleaseFeed, HttpTransport, ReleaseUpdater};
use crate::source::{CommandBuildRunner, SourceUpdater};
use anyhow::Result;
use std::time::Duration;

/// Runs both pipelines with production collaborators.
///
/// Never returns an error: pipeline failures are displayed and recorded in
/// the report, and the caller turns the report into an exit code.
pub async fn run(config: &UpdateConfig, force: bool) -> RunReport {
    let platform = platform::resolve();
    info!("Resolved platform: {platform}");

    let source = settle("source", update_source(config, force).await);
    let release = settle("release", update_release(config, force, platform).await);

    RunReport { source, release }
}

async fn update_source(config: &UpdateConfig, force: bool) -> Result<UpdateOutcome> {
    // Missing git is an unmet precondition, not an operation failure.
    if GitCli::ensure_installed().is_err() {
        tracing::warn!("git is not installed, skipping source update");
        return Ok(UpdateOutcome::Skipped);
    }
    let vcs = GitCli::new();
    let build = CommandBuildRunner::from_config(config);
    SourceUpdater::new(&vcs, &build, config).update(force).await
}

async fn update_release(
    config: &UpdateConfig,
    force: bool,
    platform: platform::PlatformId,
) -> Result<UpdateOutcome> {
    let timeout = Duration::from_secs(config.network_timeout_secs);
    let feed = GithubReleaseFeed::new(&config.release_repo, timeout)?;
    let transport = HttpTransport::new(timeout)?;
    ReleaseUpdater::new(&feed, &transport, config).update(platform, force).await
}

/// Folds a pipeline result into an outcome, rendering any error to stderr.
fn settle(pipeline: &str, result: Result<UpdateOutcome>) -> UpdateOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("{pipeline} update failed");
            user_friendly_error(e).display();
            UpdateOutcome::Failed
        }
    }
}
