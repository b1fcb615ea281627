//! Classification of webhook events into exactly one notification variant.
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use url::Url;

use crate::github::event::{PullRequestEvent, PullRequestReviewEvent, WebhookEvent};
use crate::github::CommitSha;

/// One notification to be rendered. Each variant carries exactly the data its
/// card template needs on top of the shared pull request view.
#[derive(Debug, PartialEq)]
pub enum NotificationVariant {
    ReviewRequested {
        requested_reviewer: Option<String>,
    },
    Merged {
        merge_commit: Option<CommitSha>,
        auto_merge_method: Option<String>,
        merged_by: Option<String>,
    },
    Closed,
    Opened,
    Reopened,
    GenericUpdated {
        action: String,
    },
    ReviewChangesRequested {
        reviewer: String,
        review_url: Url,
    },
    ReviewApproved {
        reviewer: String,
        review_url: Url,
    },
    ReviewCommentedWithMention {
        reviewer: String,
        review_url: Url,
        mentions: Vec<String>,
    },
    ReviewCommentedPlain {
        reviewer: String,
        review_url: Url,
    },
    ReviewOtherState {
        state: String,
        review_url: Url,
    },
}

/// Pattern of a `@login` mention inside a review comment body.
const MENTION_PATTERN: &str = r"( |^)@([A-Za-z0-9]+-?[A-Za-z0-9]+)( |$)";

fn mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MENTION_PATTERN).expect("Invalid mention pattern"))
}

/// Selects the notification variant for an event.
///
/// Returns `None` for review actions other than `submitted`; those produce no
/// notification at all.
pub fn classify(event: &WebhookEvent) -> Option<NotificationVariant> {
    match event {
        WebhookEvent::PullRequest(event) => Some(classify_pull_request(event)),
        WebhookEvent::Review(event) if event.action == "submitted" => Some(classify_review(event)),
        WebhookEvent::Review(_) => None,
    }
}

fn classify_pull_request(event: &PullRequestEvent) -> NotificationVariant {
    let pr = &event.pull_request;
    if event.action == "review_requested" {
        return NotificationVariant::ReviewRequested {
            requested_reviewer: event.requested_reviewer.clone(),
        };
    }
    // A merge arrives as action `closed` with the merged flag set, so this
    // check must stay ahead of the plain `closed` arm.
    if pr.merged {
        return NotificationVariant::Merged {
            merge_commit: pr.merge_commit_sha.clone(),
            auto_merge_method: pr.auto_merge_method.clone(),
            merged_by: pr.merged_by.clone(),
        };
    }
    match event.action.as_str() {
        "closed" => NotificationVariant::Closed,
        "opened" => NotificationVariant::Opened,
        "reopened" => NotificationVariant::Reopened,
        _ => NotificationVariant::GenericUpdated {
            action: event.action.clone(),
        },
    }
}

fn classify_review(event: &PullRequestReviewEvent) -> NotificationVariant {
    let review = &event.review;
    let reviewer = review.reviewer.clone();
    let review_url = review.html_url.clone();
    match review.state.as_str() {
        "changes_requested" => NotificationVariant::ReviewChangesRequested {
            reviewer,
            review_url,
        },
        "approved" => NotificationVariant::ReviewApproved {
            reviewer,
            review_url,
        },
        "commented" => {
            let mentions = scan_mentions(&review.body);
            if mentions.is_empty() {
                NotificationVariant::ReviewCommentedPlain {
                    reviewer,
                    review_url,
                }
            } else {
                NotificationVariant::ReviewCommentedWithMention {
                    reviewer,
                    review_url,
                    mentions,
                }
            }
        }
        _ => NotificationVariant::ReviewOtherState {
            state: review.state.clone(),
            review_url,
        },
    }
}

/// Distinct `@login` mentions in a review body, in order of first occurrence.
pub fn scan_mentions(body: &str) -> Vec<String> {
    mention_regex()
        .captures_iter(body)
        .filter_map(|caps| caps.get(2).map(|login| login.as_str().to_string()))
        .unique()
        .collect()
}
