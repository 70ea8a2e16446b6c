// src/analyze/prompt.rs
//! Prompt construction for the ranking call.

use std::fmt::Write as _;

use crate::types::SearchResult;

/// Snippets are cut to this many chars inside the prompt.
pub const PROMPT_SNIPPET_CHARS: usize = 500;

pub const SYSTEM_PROMPT: &str = "You rank news and web items for a topic digest. \
Reply with ONLY a JSON array, no prose and no code fences. \
Each element is an object: {\"index\": <integer index of a listed item>, \
\"score\": <integer 0-100 relevance>, \"rationale\": \"<one sentence>\", \
\"bullets\": [<0 to 2 short summary strings>]}. \
Omit items that are irrelevant (score below 20). \
Only reference indices from the list. Never invent, alter or add URLs.";

/// User message: topic, query, and the enumerated candidates.
pub fn build_user_prompt(results: &[SearchResult], query: &str, agent_description: &str) -> String {
    let mut out = String::with_capacity(256 + results.len() * 320);
    let topic = if agent_description.trim().is_empty() {
        query
    } else {
        agent_description
    };
    let _ = writeln!(out, "Topic: {}", topic.trim());
    let _ = writeln!(out, "Query: {}", query.trim());
    let _ = writeln!(out, "\nCandidates:");
    for (i, r) in results.iter().enumerate() {
        let date = r
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let snippet: String = r.snippet.chars().take(PROMPT_SNIPPET_CHARS).collect();
        let _ = writeln!(out, "\n[{i}] {}", r.title.trim());
        let _ = writeln!(out, "URL: {}", r.url);
        let _ = writeln!(out, "Date: {date}");
        let _ = writeln!(out, "Snippet: {}", snippet.trim());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn enumerates_every_candidate_with_stable_index() {
        let results = vec![
            SearchResult {
                title: "First".into(),
                url: "https://a.test/1".into(),
                snippet: "x".repeat(800),
                published_at: Some(Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()),
                source_name: "A".into(),
            },
            SearchResult {
                title: "Second".into(),
                url: "https://b.test/2".into(),
                snippet: "short".into(),
                published_at: None,
                source_name: "B".into(),
            },
        ];
        let p = build_user_prompt(&results, "rust", "Rust ecosystem news");
        assert!(p.starts_with("Topic: Rust ecosystem news\nQuery: rust\n"));
        assert!(p.contains("[0] First\nURL: https://a.test/1\nDate: 2025-09-06"));
        assert!(p.contains("[1] Second\nURL: https://b.test/2\nDate: unknown\nSnippet: short"));
        assert!(!p.contains(&"x".repeat(PROMPT_SNIPPET_CHARS + 1)));
    }

    #[test]
    fn empty_description_falls_back_to_query() {
        let p = build_user_prompt(&[], "tokio", "  ");
        assert!(p.starts_with("Topic: tokio\n"));
    }
}
