//! End-to-end tests of the notification pipeline against a mocked tracker.

use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use url::Url;

use crate::config::AppConfig;
use crate::github::event::{parse_event, WebhookEvent};
use crate::github::PullRequestNumber;
use crate::mergeable::MergeableState;
use crate::notify::{
    handle_webhook_event, DeliveryReport, NotifyContext, NotifyError, RunOutcome, SkipReason,
};
use crate::tests::mocks::{
    FakeMergeabilityChecker, PullRequestPayload, ReviewPayload, TrackerMock,
};
use crate::tracker::TrackerClient;

const TASK_PATTERN: &str = r"TASK-\d+";

type QueryRecorder = Arc<Mutex<Vec<(PullRequestNumber, Url)>>>;

fn parse(kind: &str, payload: Vec<u8>) -> WebhookEvent {
    parse_event(kind, &payload).unwrap().unwrap()
}

async fn test_context(
    tracker: &TrackerMock,
    pattern: &str,
    mergeable: MergeableState,
) -> (NotifyContext, QueryRecorder) {
    let config = AppConfig::new(
        &tracker.uri(),
        "bot".to_string(),
        SecretString::new("secret".to_string()),
        pattern,
        "dw".to_string(),
        None,
        "light",
    )
    .unwrap();
    let client = TrackerClient::new(
        config.tracker_url.clone(),
        config.tracker_username.clone(),
        config.tracker_password.clone(),
    )
    .unwrap();
    let checker = FakeMergeabilityChecker::new(mergeable);
    let queries = checker.query_recorder();
    let ctx = NotifyContext {
        config,
        tracker: client,
        mergeability: Box::new(checker),
    };
    (ctx, queries)
}

#[tokio::test]
async fn opened_event_delivers_to_every_task() {
    let tracker = TrackerMock::start().await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("opened").into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Delivered(DeliveryReport {
            attempted: 2,
            delivered: 2
        })
    );
    let comments = tracker.delivered_comments().await;
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].0, "12");
    assert_eq!(comments[1].0, "34");
    for (_, body) in &comments {
        assert!(body.starts_with("<p><div"));
        assert!(body.ends_with("</div></p>"));
        assert!(body.contains("has been <strong>created</strong> and is ready for review"));
    }
}

#[tokio::test]
async fn failed_delivery_does_not_stop_the_fan_out() {
    let tracker = TrackerMock::start().await;
    tracker.mount_comment_endpoint("12", 500).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("opened").into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Delivered(DeliveryReport {
            attempted: 2,
            delivered: 1
        })
    );
    assert_eq!(tracker.delivered_comments().await.len(), 2);
}

#[tokio::test]
async fn ineligible_branch_aborts_without_posting() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("opened")
            .base_branch("main")
            .into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Skipped(SkipReason::IneligibleBranch("main".to_string()))
    );
    assert!(tracker.delivered_comments().await.is_empty());
}

#[tokio::test]
async fn bot_author_aborts() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("opened")
            .author("dependabot[bot]")
            .into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Skipped(SkipReason::BotAuthor("dependabot[bot]".to_string()))
    );
}

#[tokio::test]
async fn pattern_without_digits_aborts() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, r"TASK", MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("opened")
            .title("TASK cleanup")
            .into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NoTaskIds));
    assert!(tracker.delivered_comments().await.is_empty());
}

#[tokio::test]
async fn title_without_tasks_aborts() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("opened").title("Fix a typo").into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NoTaskMatch));
    assert!(tracker.delivered_comments().await.is_empty());
}

#[tokio::test]
async fn merge_renders_commit_and_merger() {
    let tracker = TrackerMock::start().await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("closed")
            .merged("0123456789abcdef0123456789abcdef01234567", "hubot")
            .into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Delivered(_)));

    let comments = tracker.delivered_comments().await;
    let body = &comments[0].1;
    assert!(body.contains("was <strong>merged</strong> as "));
    assert!(body.contains(">0123456</a>"));
    assert!(body.contains("👾 hubot"));
}

#[tokio::test]
async fn auto_merge_renders_the_method() {
    let tracker = TrackerMock::start().await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("closed")
            .merged("0123456789abcdef0123456789abcdef01234567", "hubot")
            .auto_merge("squash")
            .into_bytes(),
    );
    handle_webhook_event(&ctx, event).await.unwrap();

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(body.contains("was <strong>auto-squash</strong>"));
}

#[tokio::test]
async fn review_request_resolves_the_reviewer() {
    let tracker = TrackerMock::start().await;
    tracker.mount_identity("ghreviewer", "jdoe").await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("review_requested")
            .requested_reviewer("ghreviewer")
            .into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Delivered(_)));

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(body.contains("is <strong>awaiting review</strong> from @jdoe"));
}

#[tokio::test]
async fn unresolvable_reviewer_fails_the_run() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("review_requested")
            .requested_reviewer("stranger")
            .into_bytes(),
    );
    let error = handle_webhook_event(&ctx, event).await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<NotifyError>(),
        Some(NotifyError::UnresolvedReviewer(login)) if login == "stranger"
    ));
    assert!(tracker.delivered_comments().await.is_empty());
}

#[tokio::test]
async fn missing_requested_reviewer_fails_the_run() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request",
        PullRequestPayload::new("review_requested").into_bytes(),
    );
    let error = handle_webhook_event(&ctx, event).await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<NotifyError>(),
        Some(NotifyError::MissingReviewer)
    ));
}

#[tokio::test]
async fn approved_review_checks_mergeability_and_badges() {
    let tracker = TrackerMock::start().await;
    tracker.mount_identity("hubot", "jdoe").await;
    tracker.mount_profile("jdoe", "John Doe").await;
    tracker.mount_identity("octocat", "creator").await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, queries) = test_context(&tracker, TASK_PATTERN, MergeableState::Mergeable).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("approved").into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Delivered(_)));

    {
        let recorded = queries.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, PullRequestNumber(7));
        assert_eq!(recorded[0].1.as_str(), "https://github.com/acme/widget.git");
    }

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(body.contains("✅ Ready to merge"));
    assert!(body.contains(">John Doe</a>"));
    assert!(body.contains(" <em>cc @creator </em>"));
}

#[tokio::test]
async fn conflicted_approval_has_no_badge() {
    let tracker = TrackerMock::start().await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Conflicted).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("approved").into_bytes(),
    );
    handle_webhook_event(&ctx, event).await.unwrap();

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(!body.contains("Ready to merge"));
    assert!(body.contains("👾 hubot"));
    assert!(!body.contains("<em>cc"));
}

#[tokio::test]
async fn profile_miss_falls_back_to_the_identity() {
    let tracker = TrackerMock::start().await;
    tracker.mount_identity("johnd", "jdoe").await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("changes_requested")
            .reviewer("johnd")
            .into_bytes(),
    );
    handle_webhook_event(&ctx, event).await.unwrap();

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(body.contains("changes requested</a> by"));
    assert!(body.contains("/profile/jdoe\""));
    assert!(body.contains(">jdoe</a>"));
}

#[tokio::test]
async fn unresolved_mentions_are_counted() {
    let tracker = TrackerMock::start().await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("commented")
            .body("cc @alice please check")
            .into_bytes(),
    );
    handle_webhook_event(&ctx, event).await.unwrap();

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(body.contains("mentioned"));
    assert!(body.contains("<em>1 user(s)</em>"));
}

#[tokio::test]
async fn resolved_mentions_are_named() {
    let tracker = TrackerMock::start().await;
    tracker.mount_identity("alice", "alice-int").await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("commented")
            .body("ping @alice and @bob")
            .into_bytes(),
    );
    handle_webhook_event(&ctx, event).await.unwrap();

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(body.contains("<strong>@alice-int </strong>"));
    assert!(!body.contains("user(s)"));
}

#[tokio::test]
async fn plain_comment_mentions_the_creator() {
    let tracker = TrackerMock::start().await;
    tracker.mount_identity("octocat", "creator").await;
    tracker.mount_comment_endpoint("12", 200).await;
    tracker.mount_comment_endpoint("34", 200).await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("commented").body("looks good").into_bytes(),
    );
    handle_webhook_event(&ctx, event).await.unwrap();

    let body = tracker.delivered_comments().await[0].1.clone();
    assert!(body.contains("new comment</a> by"));
    assert!(body.contains("👾 hubot"));
    assert!(body.contains(" <em>cc @creator </em>"));
}

#[tokio::test]
async fn review_event_passes_through_the_gates() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("approved")
            .title("Refactor internals")
            .into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NoTaskMatch));
}

#[tokio::test]
async fn non_submitted_review_is_skipped() {
    let tracker = TrackerMock::start().await;
    let (ctx, _) = test_context(&tracker, TASK_PATTERN, MergeableState::Unknown).await;

    let event = parse(
        "pull_request_review",
        ReviewPayload::new("approved").action("edited").into_bytes(),
    );
    let outcome = handle_webhook_event(&ctx, event).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Skipped(SkipReason::UnhandledReviewAction("edited".to_string()))
    );
    assert!(tracker.delivered_comments().await.is_empty());
}
