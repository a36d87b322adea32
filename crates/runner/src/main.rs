//! bookping run driver.
//!
//! One invocation is one run: fetch the booking snapshot, evaluate every
//! rule against every booking, deliver notifications, post a digest, exit.
//! Recurrence belongs to the host scheduler (cron, systemd timer); there is
//! deliberately no loop here.

mod source;
mod templates;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bookping_core::{config, Config};
use bookping_notify::{
    ChannelSet, Notification, Notifier, NotifyError, SmsNotifier, WebhookNotifier,
};
use bookping_rules::{load_rules, Engine, RunReport};
use bookping_store::{FlagStore, JsonFileFlagStore, MemoryFlagStore};

use source::{BookingSource, HttpBookingSource};

#[derive(Debug, Parser)]
#[command(name = "bookping", about = "Booking notification rule runner")]
struct Cli {
    /// Directory containing rule YAML files.
    #[arg(long, env = "BOOKPING_RULES_DIR")]
    rules_dir: Option<PathBuf>,

    /// Path of the JSON flag-store file.
    #[arg(long, env = "BOOKPING_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Evaluate rules without delivering anything or touching the flag
    /// file: in-memory store, channels replaced with logging stubs.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.rules_dir {
        config.rules_dir = dir;
    }
    if let Some(path) = cli.store_path {
        config.store_path = path;
    }

    run(config, cli.dry_run).await
}

async fn run(config: Config, dry_run: bool) -> anyhow::Result<()> {
    let store = open_store(&config, dry_run)?;
    store
        .healthcheck()
        .await
        .context("flag store healthcheck failed")?;

    let channels = build_channels(&config, dry_run)?;
    let templates = templates::load_templates(&config.templates_path)?;
    let rules = load_rules(&config.rules_dir, &channels, &templates)
        .context("rule configuration invalid")?;
    if rules.is_empty() {
        warn!(dir = %config.rules_dir.display(), "no rules loaded, run is a no-op");
    }

    let bookings = HttpBookingSource::new(config.source.clone())
        .fetch()
        .await
        .context("booking fetch failed")?;

    let now = chrono::Local::now().naive_local();
    let engine = Engine::new(store, channels, templates);
    let report = engine.process(&bookings, &rules, now).await;

    post_digest(&config, dry_run, &report).await;
    Ok(())
}

fn open_store(config: &Config, dry_run: bool) -> anyhow::Result<Arc<dyn FlagStore>> {
    if dry_run {
        info!("dry run: using in-memory flag store");
        return Ok(Arc::new(MemoryFlagStore::new()));
    }
    let store = JsonFileFlagStore::open(&config.store_path)
        .with_context(|| format!("failed to open flag store at {}", config.store_path.display()))?;
    Ok(Arc::new(store))
}

/// Build the channel registry rules may reference. A channel missing its
/// configuration is simply not registered; rules referencing it then fail
/// load validation with a precise message.
fn build_channels(config: &Config, dry_run: bool) -> anyhow::Result<ChannelSet> {
    let mut channels = ChannelSet::new();

    if config.sms.is_configured() {
        let sms = SmsNotifier::from_config(
            config.sms.api_url.clone(),
            config.sms.api_key.clone().unwrap_or_default(),
            config.sms.sender.clone().unwrap_or_default(),
        )
        .context("invalid SMS gateway configuration")?;
        register(&mut channels, "sms", Box::new(sms), dry_run);
    } else {
        info!("SMS gateway not configured, channel unavailable");
    }

    if let Some(url) = &config.digest.webhook_url {
        let webhook = WebhookNotifier::from_url(url.clone())
            .context("invalid webhook configuration")?;
        register(&mut channels, "webhook", Box::new(webhook), dry_run);
    }

    info!(channels = ?channels.names(), "notification channels ready");
    Ok(channels)
}

fn register(channels: &mut ChannelSet, name: &str, notifier: Box<dyn Notifier>, dry_run: bool) {
    if dry_run {
        channels.register(name, Box::new(DryRunNotifier { name: name.to_string() }));
    } else {
        channels.register(name, notifier);
    }
}

/// Stand-in channel for `--dry-run`: logs the would-be delivery, succeeds.
struct DryRunNotifier {
    name: String,
}

#[async_trait::async_trait]
impl Notifier for DryRunNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            channel = %self.name,
            to = notification.metadata.get("phone").map(String::as_str).unwrap_or("-"),
            body = %notification.body,
            "dry run: notification suppressed"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

/// Post the run digest to the digest webhook. Best-effort: a digest failure
/// is logged but never fails the run — the notifications already went out.
async fn post_digest(config: &Config, dry_run: bool, report: &RunReport) {
    let digest = report.render_digest();
    info!(
        bookings = report.bookings_processed(),
        matched = report.rules_matched(),
        sent = report.notifications_sent(),
        "run digest:\n{digest}"
    );

    let Some(url) = &config.digest.webhook_url else {
        return;
    };
    if dry_run {
        info!("dry run: digest webhook suppressed");
        return;
    }

    let notification = Notification::new("bookping digest", digest);
    let result = match WebhookNotifier::from_url(url.clone()) {
        Ok(webhook) => webhook.send(&notification).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!(error = %e, "digest webhook delivery failed");
    }
}
