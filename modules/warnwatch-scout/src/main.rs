use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warnwatch_common::WatchConfig;
use warnwatch_scout::notify::{ConsoleNotifier, EmailNotifier, WebhookNotifier};
use warnwatch_scout::pipeline::Monitor;
use warnwatch_scout::source::{HttpSource, XlsxParser};
use warnwatch_scout::traits::Notifier;

#[derive(Parser)]
#[command(name = "warnwatch", about = "Alert on new WARN layoff notices for tracked employers")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/warnwatch.toml")]
    config: PathBuf,

    /// Run the pipeline and log alerts without notifying or saving state
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warnwatch=info,warnwatch_scout=info,warnwatch_common=info"));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("WARN monitor starting...");

    let config = WatchConfig::load(&cli.config)?;
    config.log_redacted();

    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if config.notify.console {
        notifiers.push(Arc::new(ConsoleNotifier));
    }
    if let Some(url) = &config.notify.webhook_url {
        notifiers.push(Arc::new(WebhookNotifier::new(url.clone())));
    }
    if let Some(email) = EmailNotifier::from_config(&config.notify.email)? {
        notifiers.push(Arc::new(email));
    }

    let source = Arc::new(HttpSource::new(&config.source));
    let parser = Arc::new(XlsxParser::new(&config.source));

    let monitor = Monitor::new(config, source, parser, notifiers)?.dry_run(cli.dry_run);
    let report = monitor.run_once().await?;

    if report.skipped {
        info!(hash = &report.file_hash[..report.file_hash.len().min(16)], "No changes");
    } else {
        info!(new_notices = report.batch.total(), "Done");
    }
    Ok(())
}
