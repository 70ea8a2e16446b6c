// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One candidate item as returned by a search provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_name: String,
}

/// A search result annotated by the ranker. Built only by `analyze::ranker`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedItem {
    pub result: SearchResult,
    /// 0.0 ..= 1.0
    pub score: f64,
    pub rationale: String,
    /// At most two entries.
    pub summary_bullets: Vec<String>,
}

/// Output of one pipeline run, consumed by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub agent_name: String,
    pub query: String,
    pub window_days: u32,
    pub run_at: DateTime<Utc>,
    pub items: Vec<RankedItem>,
    pub fetched_count: usize,
    pub deduped_count: usize,
}

impl Report {
    /// Funnel invariant: fetched >= deduped >= shown.
    pub fn counts_consistent(&self) -> bool {
        self.fetched_count >= self.deduped_count && self.deduped_count >= self.items.len()
    }
}
