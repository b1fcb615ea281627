//! Gates that decide whether an event deserves a notification at all.
use std::sync::OnceLock;

use regex::Regex;

/// Grammar of base branches that are announced to tasks.
const ELIGIBLE_BRANCH_PATTERN: &str =
    r"(?i)^(master|develop(-exo|-meed)?|feature/[A-Za-z-]+[0-9]?|stable/[0-9]+(\.[0-9]+)*\.x(-exo)?)$";

/// Automated accounts whose pull requests are never announced.
const BOT_AUTHOR_PATTERN: &str = r"(?i)^(dependabot\[bot\]|snyk-bot)$";

fn eligible_branch_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ELIGIBLE_BRANCH_PATTERN).expect("Invalid branch pattern"))
}

fn bot_author_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BOT_AUTHOR_PATTERN).expect("Invalid bot pattern"))
}

/// Is this base branch interesting for task notifications?
pub fn is_eligible_branch(branch: &str) -> bool {
    eligible_branch_regex().is_match(branch)
}

/// Was the pull request authored by an automated account?
pub fn is_bot_author(login: &str) -> bool {
    bot_author_regex().is_match(login)
}
