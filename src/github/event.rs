//! Parsing of GitHub webhook payloads into the event view consumed by the
//! notification pipeline.
use anyhow::Context;
use url::Url;

use crate::github::{CommitSha, GithubRepoName, PullRequestNumber};
use crate::notify::NotifyError;

/// An event coming from the GitHub webhook that the pipeline can react to.
#[derive(Debug)]
pub enum WebhookEvent {
    /// Something happened directly on a pull request (opened, merged, closed, ...).
    PullRequest(PullRequestEvent),
    /// A review action happened on a pull request.
    Review(PullRequestReviewEvent),
}

impl WebhookEvent {
    pub fn pull_request(&self) -> &PullRequestDetails {
        match self {
            WebhookEvent::PullRequest(event) => &event.pull_request,
            WebhookEvent::Review(event) => &event.pull_request,
        }
    }
}

#[derive(Debug)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequestDetails,
    pub requested_reviewer: Option<String>,
}

#[derive(Debug)]
pub struct PullRequestReviewEvent {
    pub action: String,
    pub pull_request: PullRequestDetails,
    pub review: ReviewDetails,
}

/// Immutable view of the pull request referenced by the webhook payload.
/// Constructed once per invocation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PullRequestDetails {
    pub repo: GithubRepoName,
    pub number: PullRequestNumber,
    pub title: String,
    /// Login of the pull request author on GitHub.
    pub author: String,
    pub base_branch: String,
    /// Clone URL of the head repository. Missing when the fork was deleted.
    pub head_clone_url: Option<Url>,
    pub merged: bool,
    pub merge_commit_sha: Option<CommitSha>,
    /// Merge method of an enabled auto-merge (`merge`, `squash`, `rebase`).
    pub auto_merge_method: Option<String>,
    pub merged_by: Option<String>,
}

#[derive(Debug)]
pub struct ReviewDetails {
    pub reviewer: String,
    /// Raw review state as sent by GitHub (`approved`, `changes_requested`, ...).
    pub state: String,
    pub body: String,
    pub html_url: Url,
}

/// This struct is used to extract the fields of a webhook payload that the
/// pipeline cares about. GitHub sends much more data; everything else is ignored.
#[derive(serde::Deserialize, Debug)]
struct WebhookPayload {
    action: String,
    pull_request: Option<PullRequestData>,
    requested_reviewer: Option<UserData>,
    review: Option<ReviewData>,
    repository: RepositoryData,
}

#[derive(serde::Deserialize, Debug)]
struct RepositoryData {
    name: String,
    owner: UserData,
}

#[derive(serde::Deserialize, Debug)]
struct UserData {
    login: String,
}

#[derive(serde::Deserialize, Debug)]
struct PullRequestData {
    number: u64,
    title: Option<String>,
    user: UserData,
    base: BranchData,
    head: Option<HeadData>,
    merged: Option<bool>,
    merge_commit_sha: Option<String>,
    auto_merge: Option<AutoMergeData>,
    merged_by: Option<UserData>,
}

#[derive(serde::Deserialize, Debug)]
struct BranchData {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(serde::Deserialize, Debug)]
struct HeadData {
    repo: Option<HeadRepoData>,
}

#[derive(serde::Deserialize, Debug)]
struct HeadRepoData {
    clone_url: String,
}

#[derive(serde::Deserialize, Debug)]
struct AutoMergeData {
    merge_method: String,
}

#[derive(serde::Deserialize, Debug)]
struct ReviewData {
    user: UserData,
    state: String,
    body: Option<String>,
    html_url: String,
    pull_request: Option<PullRequestData>,
}

/// Parses a webhook event from its name and raw JSON payload.
///
/// Returns `Ok(None)` for event kinds that the pipeline does not react to.
/// Fails when the payload contains no pull request object at all, neither
/// directly nor nested inside the review.
pub fn parse_event(event_name: &str, body: &[u8]) -> anyhow::Result<Option<WebhookEvent>> {
    match event_name {
        "pull_request" => {
            let payload: WebhookPayload = serde_json::from_slice(body)?;
            let repo = parse_repository_name(&payload.repository);
            let pr_data = payload
                .pull_request
                .or_else(|| payload.review.and_then(|review| review.pull_request))
                .ok_or(NotifyError::MissingPullRequest)?;
            Ok(Some(WebhookEvent::PullRequest(PullRequestEvent {
                action: payload.action,
                pull_request: pull_request_details(repo, pr_data),
                requested_reviewer: payload.requested_reviewer.map(|user| user.login),
            })))
        }
        "pull_request_review" => {
            let payload: WebhookPayload = serde_json::from_slice(body)?;
            let repo = parse_repository_name(&payload.repository);
            let mut review = payload.review.ok_or_else(|| {
                anyhow::anyhow!("Review object is missing in a pull_request_review payload")
            })?;
            let pr_data = payload
                .pull_request
                .or_else(|| review.pull_request.take())
                .ok_or(NotifyError::MissingPullRequest)?;
            Ok(Some(WebhookEvent::Review(PullRequestReviewEvent {
                action: payload.action,
                pull_request: pull_request_details(repo, pr_data),
                review: review_details(review)?,
            })))
        }
        _ => {
            tracing::debug!("Ignoring unknown event kind {event_name}");
            Ok(None)
        }
    }
}

fn parse_repository_name(repository: &RepositoryData) -> GithubRepoName {
    GithubRepoName::new(&repository.owner.login, &repository.name)
}

fn pull_request_details(repo: GithubRepoName, data: PullRequestData) -> PullRequestDetails {
    let head_clone_url = data
        .head
        .and_then(|head| head.repo)
        .and_then(|repo| match repo.clone_url.parse::<Url>() {
            Ok(url) => Some(url),
            Err(error) => {
                tracing::warn!("Cannot parse head clone URL: {error:?}");
                None
            }
        });
    PullRequestDetails {
        repo,
        number: PullRequestNumber(data.number),
        title: data.title.unwrap_or_default(),
        author: data.user.login,
        base_branch: data.base.name,
        head_clone_url,
        merged: data.merged.unwrap_or(false),
        merge_commit_sha: data.merge_commit_sha.map(CommitSha),
        auto_merge_method: data.auto_merge.map(|auto| auto.merge_method),
        merged_by: data.merged_by.map(|user| user.login),
    }
}

fn review_details(data: ReviewData) -> anyhow::Result<ReviewDetails> {
    Ok(ReviewDetails {
        reviewer: data.user.login,
        state: data.state,
        body: data.body.unwrap_or_default(),
        html_url: data
            .html_url
            .parse()
            .context("Cannot parse review HTML URL")?,
    })
}
