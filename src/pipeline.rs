//! # Digest pipeline
//! One run: search → dedup → recency pre-filter → LLM rank → trim → render → deliver.
//!
//! Every stage takes the previous stage's full output. Only delivery can fail
//! the run; search and ranking problems degrade the report instead.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::analyze::ai_adapter::{build_llm_client, DynLlmClient};
use crate::analyze::{deduplicate, prefilter, DegradeReason, RankOutcome, Ranker};
use crate::config::AgentConfig;
use crate::notify::{build_notifier, Notifier, StdoutNotifier};
use crate::render::render;
use crate::search::types::SearchProvider;
use crate::search::{build_search_provider, search_or_empty};
use crate::types::Report;

/// One-time metrics registration (so series carry descriptions).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_fetched_total", "Items returned by the search provider.");
        describe_counter!("digest_deduped_total", "Items surviving deduplication.");
        describe_counter!("digest_shown_total", "Items included in delivered reports.");
        describe_counter!(
            "digest_ranker_fallback_total",
            "Runs where the ranker fell back to unscored items."
        );
        describe_counter!("digest_search_errors_total", "Search provider/feed errors.");
        describe_counter!("digest_messages_sent_total", "Chat messages delivered.");
        describe_histogram!("digest_rank_ms", "LLM ranking call duration in milliseconds.");
        describe_gauge!(
            "digest_last_run_ts",
            "Unix timestamp (seconds) of the last delivered run."
        );
    });
}

/// What one delivered run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub fetched: usize,
    pub deduped: usize,
    pub shown: usize,
    pub degraded: Option<DegradeReason>,
    pub messages: Vec<String>,
}

pub struct Pipeline {
    cfg: AgentConfig,
    search: Box<dyn SearchProvider>,
    ranker: Ranker,
    notifier: Box<dyn Notifier>,
}

impl Pipeline {
    /// Wire collaborators explicitly (tests, embedding).
    pub fn new(
        cfg: AgentConfig,
        search: Box<dyn SearchProvider>,
        llm: DynLlmClient,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let ranker = Ranker::new(llm, cfg.llm.timeout());
        Self {
            cfg,
            search,
            ranker,
            notifier,
        }
    }

    /// Build collaborators through the config factories. `dry_run` prints instead of sending.
    pub fn from_config(cfg: AgentConfig, dry_run: bool) -> Result<Self> {
        let search = build_search_provider(&cfg.search).context("building search provider")?;
        let llm = build_llm_client(&cfg.llm).context("building llm client")?;
        let notifier: Box<dyn Notifier> = if dry_run {
            Box::new(StdoutNotifier)
        } else {
            build_notifier(&cfg.delivery).context("building notifier")?
        };
        info!(
            agent = %cfg.name,
            search = search.name(),
            llm = llm.provider_name(),
            delivery = notifier.name(),
            "pipeline ready"
        );
        Ok(Self::new(cfg, search, llm, notifier))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.cfg
    }

    /// Search, refine and rank. Never fails.
    pub async fn build_report(&self, now: DateTime<Utc>) -> (Report, Option<DegradeReason>) {
        ensure_metrics_described();
        let cfg = &self.cfg;

        let raw = search_or_empty(
            self.search.as_ref(),
            &cfg.query,
            cfg.window_days,
            cfg.max_results,
        )
        .await;
        let fetched_count = raw.len();

        let deduped = deduplicate(raw);
        let deduped_count = deduped.len();

        let candidates = prefilter(deduped, cfg.prefilter_max);
        let outcome = self
            .ranker
            .rank(&candidates, &cfg.query, &cfg.description)
            .await;
        let degraded = match &outcome {
            RankOutcome::Degraded { reason, .. } => Some(reason.clone()),
            RankOutcome::Ranked(_) => None,
        };
        let mut items = outcome.into_items();
        items.truncate(cfg.report_size);

        counter!("digest_fetched_total").increment(fetched_count as u64);
        counter!("digest_deduped_total").increment(deduped_count as u64);

        info!(
            agent = %cfg.name,
            fetched = fetched_count,
            deduped = deduped_count,
            ranked_in = candidates.len(),
            shown = items.len(),
            degraded = degraded.is_some(),
            "report built"
        );

        let report = Report {
            agent_name: cfg.name.clone(),
            query: cfg.query.clone(),
            window_days: cfg.window_days,
            run_at: now,
            items,
            fetched_count,
            deduped_count,
        };
        (report, degraded)
    }

    /// Full run including delivery. Delivery errors are returned.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let (report, degraded) = self.build_report(now).await;
        let messages = render(&report);

        self.notifier
            .send(&messages)
            .await
            .with_context(|| format!("delivering report via {}", self.notifier.name()))?;

        counter!("digest_shown_total").increment(report.items.len() as u64);
        counter!("digest_messages_sent_total").increment(messages.len() as u64);
        gauge!("digest_last_run_ts").set(now.timestamp() as f64);
        info!(
            agent = %report.agent_name,
            messages = messages.len(),
            delivery = self.notifier.name(),
            "report delivered"
        );

        Ok(RunSummary {
            fetched: report.fetched_count,
            deduped: report.deduped_count,
            shown: report.items.len(),
            degraded,
            messages,
        })
    }
}
