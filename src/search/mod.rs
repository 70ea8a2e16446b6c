// src/search/mod.rs
pub mod providers;
pub mod types;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::SearchConfig;
use crate::search::providers::{newsapi::NewsApiProvider, rss::RssProvider};
use crate::search::types::{SearchProvider, SearchResult};

/// Factory: one branch per `[search] kind`.
pub fn build_search_provider(cfg: &SearchConfig) -> anyhow::Result<Box<dyn SearchProvider>> {
    match cfg {
        SearchConfig::Rss { feeds } => Ok(Box::new(RssProvider::from_urls(feeds.clone())?)),
        SearchConfig::Newsapi {
            api_key,
            endpoint,
            language,
        } => Ok(Box::new(NewsApiProvider::new(
            api_key.clone(),
            endpoint.clone(),
            language.clone(),
        )?)),
    }
}

/// Provider failures are not fatal: log, count, and continue with nothing.
pub async fn search_or_empty(
    provider: &dyn SearchProvider,
    query: &str,
    window_days: u32,
    max_results: usize,
) -> Vec<SearchResult> {
    match provider.search(query, window_days, max_results).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, provider = provider.name(), "search provider error");
            counter!("digest_search_errors_total").increment(1);
            Vec::new()
        }
    }
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));

    // Tags first: decoding could turn `&lt;b&gt;` text into a fake tag.
    let out = re_tags.replace_all(s, " ");
    let out = html_escape::decode_html_entities(&out);
    let out = re_ws.replace_all(&out, " ");
    let out = out.trim();

    // Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out.chars().take(1500).collect()
    } else {
        out.to_string()
    }
}

/// Lowercased query words, without boolean operators and quotes.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().count() >= 2 && !matches!(w.as_str(), "and" | "or" | "not"))
        .collect()
}

/// True when any term occurs in `text` (case-insensitive). No terms matches all.
pub fn matches_query(text: &str, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let hay = text.to_lowercase();
    terms.iter().any(|t| hay.contains(t.as_str()))
}

/// Undated items are kept; dated ones must be newer than `now - window_days`.
pub fn within_window(
    published_at: Option<DateTime<Utc>>,
    window_days: u32,
    now: DateTime<Utc>,
) -> bool {
    match published_at {
        None => true,
        Some(ts) => ts >= now - ChronoDuration::days(i64::from(window_days)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_text_strips_markup_and_collapses_ws() {
        let s = "  <p>Hello,&nbsp;&nbsp; <b>world</b></p>\n &amp; more  ";
        assert_eq!(normalize_text(s), "Hello, world & more");
    }

    #[test]
    fn query_terms_drop_operators_and_quotes() {
        assert_eq!(
            query_terms("\"Rust\" OR tokio AND a async-std"),
            vec!["rust", "tokio", "async-std"]
        );
    }

    #[test]
    fn query_matching_is_case_insensitive() {
        let terms = query_terms("Tokio runtime");
        assert!(matches_query("New TOKIO release", &terms));
        assert!(!matches_query("Unrelated", &terms));
        assert!(matches_query("anything", &[]));
    }

    #[test]
    fn window_keeps_undated_and_recent() {
        let now = Utc.with_ymd_and_hms(2025, 9, 10, 0, 0, 0).unwrap();
        assert!(within_window(None, 7, now));
        assert!(within_window(Some(now - ChronoDuration::days(6)), 7, now));
        assert!(!within_window(Some(now - ChronoDuration::days(8)), 7, now));
    }
}
