//! Topic digest agent — binary entrypoint.
//! Loads the agent config, then runs the pipeline once or on a schedule.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topic_digest::config::{config_path, AgentConfig};
use topic_digest::{scheduler, Pipeline};

#[derive(Debug, Parser)]
#[command(name = "topic-digest", version, about = "Search, rank and deliver a topic digest")]
struct Cli {
    /// Agent config (TOML). Defaults to $DIGEST_CONFIG_PATH, then config/agent.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print messages instead of delivering them.
    #[arg(long)]
    dry_run: bool,
    /// Run once even if the config sets `schedule_secs`.
    #[arg(long)]
    once: bool,
}

/// `RUST_LOG` controls the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topic_digest=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let path = config_path(cli.config);
    let cfg = AgentConfig::load_from_file(&path)
        .with_context(|| format!("loading agent config {}", path.display()))?;
    let schedule = cfg.schedule_secs.filter(|_| !cli.once);

    let pipeline = Pipeline::from_config(cfg, cli.dry_run)?;

    match schedule {
        None => {
            let summary = pipeline.run_once(chrono::Utc::now()).await?;
            tracing::info!(
                fetched = summary.fetched,
                deduped = summary.deduped,
                shown = summary.shown,
                messages = summary.messages.len(),
                degraded = summary.degraded.is_some(),
                "run complete"
            );
        }
        Some(secs) => {
            tracing::info!(every_secs = secs, "starting scheduler");
            tokio::select! {
                _ = scheduler::run_periodically(&pipeline, Duration::from_secs(secs), None) => {}
                _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
            }
        }
    }
    Ok(())
}
