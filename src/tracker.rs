//! Client for the task-tracker REST interface.
use std::time::Duration;

use anyhow::Context;
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

const USER_AGENT: &str = "taskcard/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated HTTP capability for the task tracker. Paths are resolved
/// against the configured base URL.
pub struct TrackerClient {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
}

impl TrackerClient {
    pub fn new(base_url: Url, username: String, password: SecretString) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Cannot create tracker HTTP client")?;
        Ok(Self {
            client,
            base_url,
            username,
            password,
        })
    }

    /// Sends a GET request to a tracker path. Non-success statuses are turned
    /// into errors.
    pub async fn get(&self, path: &str) -> anyhow::Result<Response> {
        let url = self.url(path)?;
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await
            .with_context(|| format!("Cannot send GET request to {url}"))?
            .error_for_status()?;
        Ok(response)
    }

    /// Posts a raw body to a tracker path under the given content type.
    pub async fn post(&self, path: &str, content_type: &str, body: String) -> anyhow::Result<()> {
        let url = self.url(path)?;
        self.client
            .post(url.clone())
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Cannot send POST request to {url}"))?
            .error_for_status()?;
        Ok(())
    }

    // Appends `path` to the base URL as path segments, so a base URL that
    // already carries a path (with or without a trailing slash) is preserved.
    fn url(&self, path: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Tracker base URL cannot be extended with a path"))?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }
}
