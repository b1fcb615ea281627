use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;
use tracing::level_filters::LevelFilter;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

use taskcard::config::AppConfig;
use taskcard::github::event::parse_event;
use taskcard::mergeable::{
    GhCliMergeabilityChecker, MergeabilityChecker, UnavailableMergeabilityChecker,
};
use taskcard::notify::{handle_webhook_event, NotifyContext, RunOutcome};
use taskcard::tracker::TrackerClient;

/// Posts a notification card to the task-tracker records referenced in a
/// pull request title, one card per pull request lifecycle webhook event.
#[derive(clap::Parser)]
struct Opts {
    /// Base URL of the task tracker.
    #[arg(long, env = "INPUT_SERVER_URL")]
    server_url: String,

    /// Username used to authenticate against the tracker.
    #[arg(long, env = "INPUT_SERVER_USERNAME")]
    server_username: String,

    /// Password used to authenticate against the tracker.
    #[arg(long, env = "INPUT_SERVER_PASSWORD")]
    server_password: String,

    /// Pattern of task references in pull request titles.
    #[arg(long, env = "INPUT_TASKS_REGEX_FILTER")]
    tasks_regex_filter: String,

    /// Site name used to build internal profile links.
    #[arg(long, env = "INPUT_SERVER_DEFAULT_SITENAME")]
    server_default_sitename: String,

    /// Token authorizing the mergeability query.
    #[arg(long, env = "INPUT_GITHUB_TOKEN")]
    github_token: Option<String>,

    /// Visual theme of the rendered cards (light or dark).
    #[arg(long, env = "INPUT_THEME", default_value = "light")]
    theme: String,

    /// Name of the webhook event being handled.
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: String,

    /// Path to the JSON payload of the webhook event.
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: PathBuf,
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    // The runner exposes its own token when the action input is not set.
    let github_token = opts
        .github_token
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .map(SecretString::new);

    let config = AppConfig::new(
        &opts.server_url,
        opts.server_username,
        SecretString::new(opts.server_password),
        &opts.tasks_regex_filter,
        opts.server_default_sitename,
        github_token,
        &opts.theme,
    )?;

    let payload = std::fs::read(&opts.event_path)
        .with_context(|| format!("Cannot read event payload at {}", opts.event_path.display()))?;
    let Some(event) = parse_event(&opts.event_name, &payload)? else {
        tracing::info!("Event {} is not handled by this action", opts.event_name);
        return Ok(());
    };

    let tracker = TrackerClient::new(
        config.tracker_url.clone(),
        config.tracker_username.clone(),
        config.tracker_password.clone(),
    )?;
    let mergeability: Box<dyn MergeabilityChecker + Send + Sync> =
        match GhCliMergeabilityChecker::try_init(config.github_token.clone()) {
            Ok(checker) => Box::new(checker),
            Err(error) => {
                tracing::warn!("Mergeability checks unavailable: {error:?}");
                Box::new(UnavailableMergeabilityChecker)
            }
        };
    let ctx = NotifyContext {
        config,
        tracker,
        mergeability,
    };

    let span = tracing::info_span!("Webhook", event = %opts.event_name);
    let outcome = handle_webhook_event(&ctx, event).instrument(span).await?;
    match outcome {
        RunOutcome::Skipped(reason) => tracing::info!("Aborting: {reason}"),
        RunOutcome::Delivered(report) => tracing::info!(
            "Run finished, {}/{} deliveries succeeded",
            report.delivered,
            report.attempted
        ),
    }
    Ok(())
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;

    runtime.block_on(run(opts))
}

fn main() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
