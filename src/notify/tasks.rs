//! Extraction of task references from the pull request title.
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;

/// Identifier of a task record in the tracker, extracted from a PR title.
///
/// Kept as a string: one pattern match contributes all of its digit runs
/// joined with a single space, so a single reference may carry more than one
/// number (`TASK-12-34` becomes the reference `12 34`, not two references).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskId(pub String);

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[0-9]+").expect("Invalid digit pattern"))
}

/// Collects every task reference from `title`.
///
/// Each non-overlapping match of `pattern` contributes one reference built
/// from the digit runs inside the match. Matches without digits are dropped.
/// Duplicate references produced by distinct matches are preserved.
pub fn extract_task_ids(title: &str, pattern: &Regex) -> Vec<TaskId> {
    pattern
        .find_iter(title)
        .filter_map(|m| {
            let id = digit_run_regex()
                .find_iter(m.as_str())
                .map(|digits| digits.as_str())
                .join(" ");
            if id.is_empty() {
                None
            } else {
                Some(TaskId(id))
            }
        })
        .collect()
}
