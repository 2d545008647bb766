//! Release feed: which OpenCode version is latest upstream?
//!
//! The production feed asks the GitHub releases API. Feed access sits behind
//! the [`ReleaseFeed`] trait because the pipeline's behavior around feed
//! results (soft skip on unreachable, compare against the marker) is exactly
//! what the tests need to exercise without a network.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Source of "latest release" information.
#[allow(async_fn_in_trait)]
pub trait ReleaseFeed {
    /// The latest release tag, or `None` when the feed answers but carries no
    /// usable release. Transport failures surface as errors; the caller
    /// treats both cases as a soft skip.
    async fn latest_tag(&self) -> Result<Option<String>>;
}

#[derive(Deserialize)]
struct LatestRelease {
    tag_name: Option<String>,
}

/// [`ReleaseFeed`] backed by the GitHub releases API.
#[derive(Debug, Clone)]
pub struct GithubReleaseFeed {
    client: reqwest::Client,
    repo: String,
}

impl GithubReleaseFeed {
    /// Builds a feed for a GitHub `owner/name` repository.
    pub fn new(repo: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // GitHub rejects requests without a User-Agent.
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            repo: repo.to_string(),
        })
    }
}

impl ReleaseFeed for GithubReleaseFeed {
    async fn latest_tag(&self) -> Result<Option<String>> {
        let url = format!("https://api.github.com/repos/{}/releases/latest", self.repo);
        debug!("Querying release feed: {url}");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Failed to query release feed for {}", self.repo))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // Repository exists but has no releases yet (or wrong repo name).
            return Ok(None);
        }

        let release: LatestRelease = response
            .error_for_status()
            .with_context(|| format!("Release feed for {} returned an error", self.repo))?
            .json()
            .await
            .context("Failed to parse release feed response")?;

        Ok(release.tag_name.filter(|tag| !tag.is_empty()))
    }
}
