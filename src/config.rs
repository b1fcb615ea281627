//! Validated configuration of one action run.
use anyhow::Context;
use regex::{Regex, RegexBuilder};
use secrecy::SecretString;
use url::Url;

use crate::notify::render::Theme;

/// Immutable configuration assembled once at process start and passed
/// explicitly into the pipeline. Raw inputs are validated here so that the
/// pipeline only ever sees parsed values.
#[derive(Debug)]
pub struct AppConfig {
    pub tracker_url: Url,
    pub tracker_username: String,
    pub tracker_password: SecretString,
    pub tasks_pattern: Regex,
    pub default_sitename: String,
    pub github_token: Option<SecretString>,
    pub theme: Theme,
}

impl AppConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tracker_url: &str,
        tracker_username: String,
        tracker_password: SecretString,
        tasks_pattern: &str,
        default_sitename: String,
        github_token: Option<SecretString>,
        theme: &str,
    ) -> anyhow::Result<Self> {
        let tracker_url = tracker_url
            .parse::<Url>()
            .with_context(|| format!("Cannot parse tracker URL `{tracker_url}`"))?;
        let tasks_pattern = RegexBuilder::new(tasks_pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Cannot compile task pattern `{tasks_pattern}`"))?;
        let theme = theme.parse::<Theme>()?;
        Ok(Self {
            tracker_url,
            tracker_username,
            tracker_password,
            tasks_pattern,
            default_sitename,
            github_token,
            theme,
        })
    }
}
