// src/analyze/ranker.rs
//! LLM ranking + summarization with a fail-open fallback.
//!
//! The completion is untrusted text expected to hold a JSON array. Parsing is
//! two-level:
//! - **whole response**: call error, timeout, non-JSON or non-array body
//!   → every input item is returned unscored ([`FALLBACK_RATIONALE`], score 0.5)
//!   in input order;
//! - **per element**: entries that do not match the expected shape, point at an
//!   unknown index, or score below [`MIN_SCORE`] are dropped one by one.
//!
//! Output is sorted by score descending; ties keep input index order.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use crate::analyze::ai_adapter::{DynLlmClient, LlmError};
use crate::analyze::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::types::{RankedItem, SearchResult};

pub const FALLBACK_SCORE: f64 = 0.5;
pub const FALLBACK_RATIONALE: &str = "LLM unavailable";
/// Raw scores (0-100) below this are treated as irrelevant.
pub const MIN_SCORE: f64 = 20.0;
pub const MAX_BULLETS: usize = 2;
pub const MAX_BULLET_CHARS: usize = 200;

/// Why the ranker fell back to unscored output.
#[derive(Debug, Clone, PartialEq)]
pub enum DegradeReason {
    /// The client is disabled; no call was made.
    NotInvoked,
    CallFailed(String),
    Timeout(Duration),
    Unparseable(String),
    NotAnArray,
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInvoked => write!(f, "llm not invoked"),
            Self::CallFailed(e) => write!(f, "llm call failed: {e}"),
            Self::Timeout(d) => write!(f, "llm call timed out after {d:?}"),
            Self::Unparseable(e) => write!(f, "response is not JSON: {e}"),
            Self::NotAnArray => write!(f, "response JSON is not an array"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RankOutcome {
    Ranked(Vec<RankedItem>),
    Degraded {
        reason: DegradeReason,
        items: Vec<RankedItem>,
    },
}

impl RankOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn into_items(self) -> Vec<RankedItem> {
        match self {
            Self::Ranked(items) | Self::Degraded { items, .. } => items,
        }
    }
}

/// Per-element shape. `index` and `score` are strict (a mismatch drops the
/// entry); `rationale` and `bullets` degrade to empty when mistyped.
#[derive(Debug, Deserialize)]
struct RawRanking {
    index: usize,
    score: f64,
    #[serde(default, deserialize_with = "lenient_text")]
    rationale: Option<String>,
    #[serde(default, deserialize_with = "lenient_bullets")]
    bullets: Vec<String>,
}

fn lenient_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// An array keeps its string members, a bare string is one bullet.
fn lenient_bullets<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        serde_json::Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

pub struct Ranker {
    client: DynLlmClient,
    timeout: Duration,
}

impl Ranker {
    pub fn new(client: DynLlmClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Never fails; see [`Ranker::rank`] for the detailed outcome.
    pub async fn rank_and_summarize(
        &self,
        results: &[SearchResult],
        query: &str,
        agent_description: &str,
    ) -> Vec<RankedItem> {
        self.rank(results, query, agent_description)
            .await
            .into_items()
    }

    pub async fn rank(
        &self,
        results: &[SearchResult],
        query: &str,
        agent_description: &str,
    ) -> RankOutcome {
        if results.is_empty() {
            return RankOutcome::Ranked(Vec::new());
        }

        let user = build_user_prompt(results, query, agent_description);
        let t0 = Instant::now();
        let reply = tokio::time::timeout(self.timeout, self.client.complete(SYSTEM_PROMPT, &user))
            .await
            .unwrap_or(Err(LlmError::Timeout(self.timeout)));
        histogram!("digest_rank_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let text = match reply {
            Ok(text) => text,
            Err(LlmError::Disabled) => return degrade(results, DegradeReason::NotInvoked),
            Err(LlmError::Timeout(d)) => return degrade(results, DegradeReason::Timeout(d)),
            Err(e) => return degrade(results, DegradeReason::CallFailed(e.to_string())),
        };

        match parse_rankings(&text, results) {
            Ok(items) => {
                info!(
                    provider = self.client.provider_name(),
                    candidates = results.len(),
                    kept = items.len(),
                    "ranker: scored"
                );
                RankOutcome::Ranked(items)
            }
            Err(reason) => degrade(results, reason),
        }
    }
}

fn degrade(results: &[SearchResult], reason: DegradeReason) -> RankOutcome {
    warn!(%reason, items = results.len(), "ranker: falling back to unscored items");
    counter!("digest_ranker_fallback_total").increment(1);
    RankOutcome::Degraded {
        reason,
        items: fallback_items(results),
    }
}

/// Every input item, unscored, in input order.
pub fn fallback_items(results: &[SearchResult]) -> Vec<RankedItem> {
    results
        .iter()
        .map(|r| RankedItem {
            result: r.clone(),
            score: FALLBACK_SCORE,
            rationale: FALLBACK_RATIONALE.to_string(),
            summary_bullets: Vec::new(),
        })
        .collect()
}

/// Models like to wrap JSON in ```json fences; peel one layer off.
fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Validate the completion and map it onto the input results.
pub fn parse_rankings(
    text: &str,
    results: &[SearchResult],
) -> Result<Vec<RankedItem>, DegradeReason> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| DegradeReason::Unparseable(e.to_string()))?;
    let serde_json::Value::Array(entries) = value else {
        return Err(DegradeReason::NotAnArray);
    };

    let mut seen: HashSet<usize> = HashSet::new();
    let mut kept: Vec<(usize, RankedItem)> = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;

    for (pos, entry) in entries.into_iter().enumerate() {
        let raw: RawRanking = match serde_json::from_value(entry) {
            Ok(r) => r,
            Err(e) => {
                debug!(pos, error = %e, "ranker: malformed entry dropped");
                dropped += 1;
                continue;
            }
        };
        let Some(result) = results.get(raw.index) else {
            debug!(pos, index = raw.index, "ranker: index out of range");
            dropped += 1;
            continue;
        };
        let score = raw.score.clamp(0.0, 100.0);
        if score < MIN_SCORE || !seen.insert(raw.index) {
            dropped += 1;
            continue;
        }
        kept.push((
            raw.index,
            RankedItem {
                result: result.clone(),
                score: score / 100.0,
                rationale: raw.rationale.unwrap_or_default().trim().to_string(),
                summary_bullets: clean_bullets(raw.bullets),
            },
        ));
    }

    if dropped > 0 {
        debug!(dropped, kept = kept.len(), "ranker: entries dropped");
    }

    // Index order first so the stable score sort breaks ties by input position.
    kept.sort_by_key(|(idx, _)| *idx);
    kept.sort_by(|(_, a), (_, b)| b.score.total_cmp(&a.score));
    Ok(kept.into_iter().map(|(_, item)| item).collect())
}

fn clean_bullets(bullets: Vec<String>) -> Vec<String> {
    bullets
        .into_iter()
        .map(|b| b.trim().chars().take(MAX_BULLET_CHARS).collect::<String>())
        .filter(|b| !b.is_empty())
        .take(MAX_BULLETS)
        .collect()
}
