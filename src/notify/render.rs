//! Rendering of notification cards.
//!
//! Every public method is a pure function of its inputs: identities are
//! resolved by the caller, no I/O happens here and identical inputs produce
//! byte-identical HTML. Optional fragments degrade to the empty string
//! instead of failing the render.
use std::str::FromStr;
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use url::Url;

use crate::github::event::PullRequestDetails;
use crate::github::CommitSha;
use crate::mergeable::MergeableState;
use crate::notify::identity::{InternalIdentity, ResolvedUser};

/// Visual theme of the rendered cards. The two palettes share every template;
/// only colors differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    fn palette(self) -> &'static Palette {
        match self {
            Theme::Light => &LIGHT,
            Theme::Dark => &DARK,
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(anyhow::anyhow!("Unknown theme `{s}`, expected light or dark")),
        }
    }
}

/// Inline-CSS fragments and accent colors of one theme.
struct Palette {
    card: &'static str,
    icon: &'static str,
    link: &'static str,
    user_link: &'static str,
    external_user_link: &'static str,
    branch_badge: &'static str,
    commit_badge: &'static str,
    mergeable_badge: &'static str,
    created: &'static str,
    merged: &'static str,
    closed: &'static str,
    reopened: &'static str,
    review: &'static str,
    approved: &'static str,
    changes: &'static str,
    comment: &'static str,
    mention: &'static str,
    info: &'static str,
}

static LIGHT: Palette = Palette {
    card: "display: inline-block; background: linear-gradient(135deg, #f8f9fa 0%, #e9ecef 100%); border-left: 4px solid #6c757d; border-radius: 8px; padding: 12px 16px; margin: 8px 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 14px; line-height: 1.5; color: #212529; box-shadow: 0 2px 4px rgba(0,0,0,0.1);",
    icon: "font-size: 16px; margin-right: 8px;",
    link: "color: #0969da; text-decoration: none; font-weight: 600; background: rgba(9, 105, 218, 0.1); padding: 2px 6px; border-radius: 4px;",
    user_link: "color: #8250df; text-decoration: none; font-weight: 500; background: rgba(130, 80, 223, 0.1); padding: 2px 6px; border-radius: 4px;",
    external_user_link: "color: #57606a; text-decoration: none; font-weight: 500; background: rgba(87, 96, 106, 0.1); padding: 2px 6px; border-radius: 4px;",
    branch_badge: "background: #ddf4ff; color: #0969da; padding: 2px 8px; border-radius: 4px; font-family: ui-monospace, SFMono-Regular, monospace; font-size: 12px;",
    commit_badge: "background: #fff8c5; color: #9a6700; padding: 2px 8px; border-radius: 4px; font-family: ui-monospace, SFMono-Regular, monospace; font-size: 12px;",
    mergeable_badge: "display: inline-block; padding: 2px 8px; border-radius: 12px; font-size: 12px; font-weight: 600; margin-left: 8px; background: #d1f7c4; color: #1e7e34;",
    created: "#2da44e",
    merged: "#8250df",
    closed: "#cf222e",
    reopened: "#bf8700",
    review: "#0969da",
    approved: "#2da44e",
    changes: "#bf8700",
    comment: "#57606a",
    mention: "#8250df",
    info: "#6c757d",
};

static DARK: Palette = Palette {
    card: "display: inline-block; background: linear-gradient(135deg, #161b22 0%, #0d1117 100%); border-left: 4px solid #484f58; border-radius: 8px; padding: 12px 16px; margin: 8px 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; font-size: 14px; line-height: 1.5; color: #c9d1d9; box-shadow: 0 2px 4px rgba(0,0,0,0.4);",
    icon: "font-size: 16px; margin-right: 8px;",
    link: "color: #58a6ff; text-decoration: none; font-weight: 600; background: rgba(56, 139, 253, 0.15); padding: 2px 6px; border-radius: 4px;",
    user_link: "color: #bc8cff; text-decoration: none; font-weight: 500; background: rgba(188, 140, 255, 0.15); padding: 2px 6px; border-radius: 4px;",
    external_user_link: "color: #8b949e; text-decoration: none; font-weight: 500; background: rgba(139, 148, 158, 0.15); padding: 2px 6px; border-radius: 4px;",
    branch_badge: "background: rgba(56, 139, 253, 0.15); color: #58a6ff; padding: 2px 8px; border-radius: 4px; font-family: ui-monospace, SFMono-Regular, monospace; font-size: 12px;",
    commit_badge: "background: rgba(187, 128, 9, 0.15); color: #d29922; padding: 2px 8px; border-radius: 4px; font-family: ui-monospace, SFMono-Regular, monospace; font-size: 12px;",
    mergeable_badge: "display: inline-block; padding: 2px 8px; border-radius: 12px; font-size: 12px; font-weight: 600; margin-left: 8px; background: rgba(46, 160, 67, 0.15); color: #3fb950;",
    created: "#3fb950",
    merged: "#bc8cff",
    closed: "#f85149",
    reopened: "#d29922",
    review: "#58a6ff",
    approved: "#3fb950",
    changes: "#d29922",
    comment: "#8b949e",
    mention: "#bc8cff",
    info: "#8b949e",
};

// Strips the branch folder prefixes for the badge label only. Link targets
// and titles keep the full branch name.
fn branch_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:feature|stable)/").expect("Invalid branch prefix pattern"))
}

pub struct Renderer<'a> {
    palette: &'static Palette,
    sitename: &'a str,
    pr: &'a PullRequestDetails,
}

impl<'a> Renderer<'a> {
    pub fn new(theme: Theme, sitename: &'a str, pr: &'a PullRequestDetails) -> Self {
        Self {
            palette: theme.palette(),
            sitename,
            pr,
        }
    }

    pub fn review_requested(&self, reviewer: &InternalIdentity) -> String {
        self.card(
            self.palette.review,
            "👀",
            &format!(
                "{} is <strong>awaiting review</strong> from @{reviewer} ",
                self.pr_link()
            ),
        )
    }

    pub fn merged(
        &self,
        merge_commit: Option<&CommitSha>,
        auto_merge_method: Option<&str>,
        merger: Option<&ResolvedUser>,
    ) -> String {
        let method = match auto_merge_method {
            Some(method) => format!("auto-{method}"),
            None => "merged".to_string(),
        };
        let as_commit = merge_commit
            .map(|sha| format!(" as {}", self.commit_link(sha)))
            .unwrap_or_default();
        let by_merger = merger
            .map(|user| format!(" by {}", self.resolved_user_link(user)))
            .unwrap_or_default();
        self.card(
            self.palette.merged,
            "🎉",
            &format!(
                "{} was <strong>{method}</strong>{as_commit} into {}{by_merger}",
                self.pr_link(),
                self.branch_link()
            ),
        )
    }

    pub fn closed(&self) -> String {
        self.card(
            self.palette.closed,
            "🚫",
            &format!(
                "{} has been <strong>closed</strong> without merging",
                self.pr_link()
            ),
        )
    }

    pub fn opened(&self) -> String {
        self.card(
            self.palette.created,
            "🚀",
            &format!(
                "{} has been <strong>created</strong> and is ready for review",
                self.pr_link()
            ),
        )
    }

    pub fn reopened(&self) -> String {
        self.card(
            self.palette.reopened,
            "🔄",
            &format!("{} has been <strong>reopened</strong>", self.pr_link()),
        )
    }

    pub fn generic_updated(&self, action: &str) -> String {
        self.card(
            self.palette.info,
            "ℹ️",
            &format!("{} has been updated <em>({action})</em>", self.pr_link()),
        )
    }

    pub fn changes_requested(
        &self,
        reviewer: &ResolvedUser,
        review_url: &Url,
        cc: Option<&InternalIdentity>,
    ) -> String {
        let changes_link = self.event_link(review_url, "changes requested", self.palette.changes);
        self.card(
            self.palette.changes,
            "🔧",
            &format!(
                "{} has {changes_link} by {}{}",
                self.pr_link(),
                self.resolved_user_link(reviewer),
                self.cc_fragment(cc)
            ),
        )
    }

    pub fn approved(
        &self,
        reviewer: &ResolvedUser,
        review_url: &Url,
        mergeable: MergeableState,
        cc: Option<&InternalIdentity>,
    ) -> String {
        let approved_link = self.event_link(review_url, "approved", self.palette.approved);
        let badge = match mergeable {
            MergeableState::Mergeable => self.mergeable_badge(),
            MergeableState::Conflicted | MergeableState::Unknown => String::new(),
        };
        self.card(
            self.palette.approved,
            "✅",
            &format!(
                "{} has been {approved_link} by {}{badge}{}",
                self.pr_link(),
                self.resolved_user_link(reviewer),
                self.cc_fragment(cc)
            ),
        )
    }

    /// Renders the mention card. `total_mentions` counts every distinct
    /// mention scanned from the body; when none of them resolved, the card
    /// names nobody and states that count instead.
    pub fn comment_mention(
        &self,
        reviewer: &ResolvedUser,
        review_url: &Url,
        resolved: &[InternalIdentity],
        total_mentions: usize,
    ) -> String {
        let mention_link = self.event_link(review_url, "mentioned", self.palette.mention);
        let mentioned = if resolved.is_empty() {
            format!("<em>{total_mentions} user(s)</em>")
        } else {
            format!(
                "<strong>{}</strong>",
                resolved
                    .iter()
                    .map(|identity| format!("@{identity} "))
                    .join("</strong> and <strong>")
            )
        };
        self.card(
            self.palette.mention,
            "📣",
            &format!(
                "{} {mention_link} {mentioned} in a comment by {}",
                self.pr_link(),
                self.resolved_user_link(reviewer)
            ),
        )
    }

    pub fn comment_plain(
        &self,
        reviewer: &ResolvedUser,
        review_url: &Url,
        cc: Option<&InternalIdentity>,
    ) -> String {
        let comment_link = self.event_link(review_url, "new comment", self.palette.comment);
        self.card(
            self.palette.comment,
            "💬",
            &format!(
                "{} has a {comment_link} by {}{}",
                self.pr_link(),
                self.resolved_user_link(reviewer),
                self.cc_fragment(cc)
            ),
        )
    }

    pub fn review_other(&self, state: &str, review_url: &Url) -> String {
        let state_link = self.event_link(review_url, state, self.palette.info);
        self.card(
            self.palette.info,
            "ℹ️",
            &format!("{} review status: {state_link}", self.pr_link()),
        )
    }

    fn card(&self, color: &str, icon: &str, content: &str) -> String {
        format!(
            "<div style=\"{} border-left-color: {color};\"><span style=\"{}\">{icon}</span> {content}</div>",
            self.palette.card, self.palette.icon
        )
    }

    fn pr_link(&self) -> String {
        let repo = &self.pr.repo;
        let number = self.pr.number;
        let reduced_branch = branch_prefix_regex().replace_all(&self.pr.base_branch, "");
        format!(
            "<a href=\"https://github.com/{repo}/pull/{number}\" target=\"_blank\" style=\"{}\" title=\"{repo}#{number}\">{}#{number}</a> <span style=\"{}\">{reduced_branch}</span>",
            self.palette.link,
            repo.name(),
            self.palette.branch_badge
        )
    }

    fn resolved_user_link(&self, user: &ResolvedUser) -> String {
        match user {
            ResolvedUser::Internal {
                identity,
                display_name,
            } => self.user_link(identity, display_name),
            ResolvedUser::External { login } => self.external_user_link(login),
        }
    }

    fn user_link(&self, identity: &InternalIdentity, display_name: &str) -> String {
        format!(
            "<a href=\"/portal/{}/profile/{identity}\" target=\"_self\" rel=\"noopener\" style=\"{}\">{display_name}</a>",
            self.sitename, self.palette.user_link
        )
    }

    fn external_user_link(&self, login: &str) -> String {
        format!(
            "<a href=\"https://github.com/{login}\" target=\"_blank\" rel=\"noopener\" style=\"{}\">👾 {login}</a>",
            self.palette.external_user_link
        )
    }

    fn commit_link(&self, sha: &CommitSha) -> String {
        format!(
            "<a href=\"https://github.com/{}/commit/{sha}\" target=\"_blank\" style=\"{}\">{}</a>",
            self.pr.repo,
            self.palette.commit_badge,
            sha.short()
        )
    }

    fn branch_link(&self) -> String {
        format!(
            "<a href=\"https://github.com/{}/tree/{}\" target=\"_blank\" style=\"{}\">{}</a>",
            self.pr.repo, self.pr.base_branch, self.palette.branch_badge, self.pr.base_branch
        )
    }

    fn event_link(&self, url: &Url, text: &str, color: &str) -> String {
        format!(
            "<a href=\"{url}\" target=\"_blank\" style=\"color: {color}; text-decoration: none; font-weight: 600;\">{text}</a>"
        )
    }

    fn mergeable_badge(&self) -> String {
        format!(
            "<span style=\"{}\">✅ Ready to merge</span>",
            self.palette.mergeable_badge
        )
    }

    fn cc_fragment(&self, cc: Option<&InternalIdentity>) -> String {
        cc.map(|identity| format!(" <em>cc @{identity} </em>"))
            .unwrap_or_default()
    }
}
