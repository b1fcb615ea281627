//! The notification pipeline: gates, task extraction, classification,
//! identity resolution, rendering and delivery of one webhook event.
use thiserror::Error;

mod branch;
mod classifier;
mod dispatch;
mod identity;
pub mod render;
mod tasks;

pub use classifier::{classify, NotificationVariant};
pub use dispatch::DeliveryReport;
pub use identity::{IdentityResolver, InternalIdentity, ResolvedUser};
pub use tasks::{extract_task_ids, TaskId};

use crate::config::AppConfig;
use crate::github::event::WebhookEvent;
use crate::mergeable::{MergeabilityChecker, MergeableState};
use crate::notify::render::Renderer;
use crate::tracker::TrackerClient;
use crate::utils::text::pluralize;

/// Failures that terminate the run with an error.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no pull request found in the webhook payload")]
    MissingPullRequest,
    #[error("no requested reviewer found in the webhook payload")]
    MissingReviewer,
    #[error("cannot resolve an internal identity for reviewer `{0}`")]
    UnresolvedReviewer(String),
}

/// A normal no-op outcome. The run ends successfully without delivering
/// anything.
#[derive(Debug, PartialEq, Eq)]
pub enum SkipReason {
    IneligibleBranch(String),
    BotAuthor(String),
    NoTaskMatch,
    NoTaskIds,
    UnhandledReviewAction(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::IneligibleBranch(branch) => {
                write!(f, "Branch {branch} is not supported for task notification")
            }
            SkipReason::BotAuthor(login) => {
                write!(f, "Pull request author {login} is a bot")
            }
            SkipReason::NoTaskMatch => {
                f.write_str("No relevant tasks found in the pull request title")
            }
            SkipReason::NoTaskIds => f.write_str("No task ids found in the pull request title"),
            SkipReason::UnhandledReviewAction(action) => {
                write!(f, "Review action {action} does not produce a notification")
            }
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped(SkipReason),
    Delivered(DeliveryReport),
}

/// Everything one invocation needs: the validated configuration plus the two
/// injected capabilities (tracker client and mergeability checker).
pub struct NotifyContext {
    pub config: AppConfig,
    pub tracker: TrackerClient,
    pub mergeability: Box<dyn MergeabilityChecker + Send + Sync>,
}

/// Executes the notification pipeline for one parsed webhook event.
pub async fn handle_webhook_event(
    ctx: &NotifyContext,
    event: WebhookEvent,
) -> anyhow::Result<RunOutcome> {
    let pr = event.pull_request();

    if !branch::is_eligible_branch(&pr.base_branch) {
        return Ok(RunOutcome::Skipped(SkipReason::IneligibleBranch(
            pr.base_branch.clone(),
        )));
    }
    if branch::is_bot_author(&pr.author) {
        return Ok(RunOutcome::Skipped(SkipReason::BotAuthor(pr.author.clone())));
    }
    if !ctx.config.tasks_pattern.is_match(&pr.title) {
        return Ok(RunOutcome::Skipped(SkipReason::NoTaskMatch));
    }
    let task_ids = tasks::extract_task_ids(&pr.title, &ctx.config.tasks_pattern);
    if task_ids.is_empty() {
        return Ok(RunOutcome::Skipped(SkipReason::NoTaskIds));
    }

    let variant = match classifier::classify(&event) {
        Some(variant) => variant,
        None => {
            let action = match &event {
                WebhookEvent::PullRequest(event) => event.action.clone(),
                WebhookEvent::Review(event) => event.action.clone(),
            };
            return Ok(RunOutcome::Skipped(SkipReason::UnhandledReviewAction(
                action,
            )));
        }
    };

    tracing::info!(
        "{} {} found, starting notifications",
        task_ids.len(),
        pluralize("task", task_ids.len())
    );

    let resolver = IdentityResolver::new(&ctx.tracker);
    let renderer = Renderer::new(ctx.config.theme, &ctx.config.default_sitename, pr);

    // The creator cc is resolved once per review event, ahead of the
    // sub-variant branch. Only some card templates include the fragment.
    let cc = match &event {
        WebhookEvent::Review(_) => resolver.resolve_internal(&pr.author).await,
        WebhookEvent::PullRequest(_) => None,
    };

    let html = match variant {
        NotificationVariant::ReviewRequested { requested_reviewer } => {
            let login = requested_reviewer.ok_or(NotifyError::MissingReviewer)?;
            let identity = resolver
                .resolve_internal(&login)
                .await
                .ok_or(NotifyError::UnresolvedReviewer(login))?;
            tracing::info!("Review requested from {identity}");
            renderer.review_requested(&identity)
        }
        NotificationVariant::Merged {
            merge_commit,
            auto_merge_method,
            merged_by,
        } => {
            let merger = match merged_by {
                Some(login) => Some(resolver.resolve_user(&login).await),
                None => None,
            };
            renderer.merged(
                merge_commit.as_ref(),
                auto_merge_method.as_deref(),
                merger.as_ref(),
            )
        }
        NotificationVariant::Closed => renderer.closed(),
        NotificationVariant::Opened => renderer.opened(),
        NotificationVariant::Reopened => renderer.reopened(),
        NotificationVariant::GenericUpdated { action } => renderer.generic_updated(&action),
        NotificationVariant::ReviewChangesRequested {
            reviewer,
            review_url,
        } => {
            let reviewer = resolver.resolve_user(&reviewer).await;
            renderer.changes_requested(&reviewer, &review_url, cc.as_ref())
        }
        NotificationVariant::ReviewApproved {
            reviewer,
            review_url,
        } => {
            let reviewer = resolver.resolve_user(&reviewer).await;
            let mergeable = match &pr.head_clone_url {
                Some(clone_url) => ctx.mergeability.query(pr.number, clone_url).await,
                None => {
                    tracing::warn!("Missing head clone URL, skipping the mergeability check");
                    MergeableState::Unknown
                }
            };
            renderer.approved(&reviewer, &review_url, mergeable, cc.as_ref())
        }
        NotificationVariant::ReviewCommentedWithMention {
            reviewer,
            review_url,
            mentions,
        } => {
            let reviewer = resolver.resolve_user(&reviewer).await;
            let resolved: Vec<InternalIdentity> = futures::future::join_all(
                mentions
                    .iter()
                    .map(|login| resolver.resolve_internal(login)),
            )
            .await
            .into_iter()
            .flatten()
            .collect();
            renderer.comment_mention(&reviewer, &review_url, &resolved, mentions.len())
        }
        NotificationVariant::ReviewCommentedPlain {
            reviewer,
            review_url,
        } => {
            let reviewer = resolver.resolve_user(&reviewer).await;
            renderer.comment_plain(&reviewer, &review_url, cc.as_ref())
        }
        NotificationVariant::ReviewOtherState { state, review_url } => {
            renderer.review_other(&state, &review_url)
        }
    };

    tracing::info!("Rendered card: {html}");

    let report = dispatch::deliver(&ctx.tracker, &html, &task_ids).await;
    Ok(RunOutcome::Delivered(report))
}
