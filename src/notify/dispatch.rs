//! Delivery of a rendered card to every referenced task.
use tracing::Instrument;

use crate::notify::tasks::TaskId;
use crate::tracker::TrackerClient;
use crate::utils::logging::LogError;
use crate::utils::text::pluralize;

const COMMENT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Per-run delivery tally. Failed deliveries are counted, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
}

/// Posts `html`, wrapped in a paragraph container, to every task id in turn.
/// Each delivery is independent: a failure is logged through the task's span
/// and the loop moves on to the remaining tasks.
pub async fn deliver(tracker: &TrackerClient, html: &str, tasks: &[TaskId]) -> DeliveryReport {
    let body = format!("<p>{html}</p>");
    let mut delivered = 0;
    for task in tasks {
        let span = tracing::info_span!("TaskDelivery", task = %task);
        let result = tracker
            .post(
                &format!("tasks/{task}/comments"),
                COMMENT_CONTENT_TYPE,
                body.clone(),
            )
            .instrument(span.clone())
            .await;
        match result {
            Ok(()) => {
                delivered += 1;
                span.in_scope(|| tracing::info!("Comment delivered to task #{task}"));
            }
            Err(error) => span.log_error(error),
        }
    }
    let report = DeliveryReport {
        attempted: tasks.len(),
        delivered,
    };
    tracing::info!(
        "Delivered {} of {} task {}",
        report.delivered,
        report.attempted,
        pluralize("comment", report.attempted)
    );
    report
}
