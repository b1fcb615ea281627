//! Querying whether a pull request is ready to merge.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::github::PullRequestNumber;

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Readiness of a pull request to be merged without conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeableState {
    Mergeable,
    Conflicted,
    Unknown,
}

impl MergeableState {
    fn from_status(status: &str) -> MergeableState {
        match status {
            "MERGEABLE" => MergeableState::Mergeable,
            "CONFLICTING" => MergeableState::Conflicted,
            _ => MergeableState::Unknown,
        }
    }
}

/// Capability answering the mergeability question.
#[async_trait]
pub trait MergeabilityChecker {
    async fn query(&self, number: PullRequestNumber, head_clone_url: &Url) -> MergeableState;
}

/// Queries mergeability through the `gh` CLI.
pub struct GhCliMergeabilityChecker {
    gh: PathBuf,
    token: Option<SecretString>,
}

impl GhCliMergeabilityChecker {
    /// Try to locate a `gh` binary.
    pub fn try_init(token: Option<SecretString>) -> anyhow::Result<Self> {
        let gh = which::which("gh").context("gh was not found")?;
        Ok(Self { gh, token })
    }

    async fn run_query(
        &self,
        number: PullRequestNumber,
        head_clone_url: &Url,
    ) -> anyhow::Result<MergeableState> {
        let mut cmd = tokio::process::Command::new(&self.gh);
        cmd.kill_on_drop(true)
            .arg("pr")
            .arg("view")
            .arg(number.to_string())
            .arg("--repo")
            .arg(head_clone_url.as_str())
            .arg("--json")
            .arg("mergeable")
            .arg("-q")
            .arg(".mergeable");
        if let Some(token) = &self.token {
            cmd.env("GH_TOKEN", token.expose_secret());
        }
        let output = tokio::time::timeout(QUERY_TIMEOUT, cmd.output())
            .await
            .context("Mergeability query timed out")?
            .context("Cannot execute gh")?;
        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "gh ended with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        let status = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(MergeableState::from_status(&status))
    }
}

#[async_trait]
impl MergeabilityChecker for GhCliMergeabilityChecker {
    // Every failure mode, timeout included, folds to `Unknown`.
    async fn query(&self, number: PullRequestNumber, head_clone_url: &Url) -> MergeableState {
        match self.run_query(number, head_clone_url).await {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!("Failed to check mergeable status: {error:?}");
                MergeableState::Unknown
            }
        }
    }
}

/// Stands in when no `gh` binary is available. Always answers `Unknown`, so
/// approved cards simply render without the readiness badge.
pub struct UnavailableMergeabilityChecker;

#[async_trait]
impl MergeabilityChecker for UnavailableMergeabilityChecker {
    async fn query(&self, _number: PullRequestNumber, _head_clone_url: &Url) -> MergeableState {
        MergeableState::Unknown
    }
}
