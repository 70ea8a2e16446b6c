// src/analyze/recency.rs
//! Recency pre-filter: a cost gate in front of the ranker, not a relevance
//! judgment. Newest first, undated items last, then keep the first `max_items`.

use std::cmp::Ordering;

use crate::types::SearchResult;

pub fn prefilter(mut results: Vec<SearchResult>, max_items: usize) -> Vec<SearchResult> {
    // `sort_by` is stable: undated items and equal timestamps keep input order.
    results.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    results.truncate(max_items);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(title: &str, day: Option<u32>) -> SearchResult {
        SearchResult {
            title: title.into(),
            url: format!("https://example.test/{title}"),
            snippet: String::new(),
            published_at: day.map(|d| Utc.with_ymd_and_hms(2025, 9, d, 12, 0, 0).unwrap()),
            source_name: "test".into(),
        }
    }

    fn titles(v: &[SearchResult]) -> Vec<&str> {
        v.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn newest_first_undated_last_in_input_order() {
        let out = prefilter(
            vec![
                item("u1", None),
                item("d3", Some(3)),
                item("u2", None),
                item("d9", Some(9)),
                item("d5", Some(5)),
            ],
            10,
        );
        assert_eq!(titles(&out), vec!["d9", "d5", "d3", "u1", "u2"]);
    }

    #[test]
    fn equal_dates_keep_input_order() {
        let out = prefilter(vec![item("a", Some(4)), item("b", Some(4))], 10);
        assert_eq!(titles(&out), vec!["a", "b"]);
    }

    #[test]
    fn truncates_to_max_items() {
        let out = prefilter(
            vec![item("a", Some(1)), item("b", Some(2)), item("c", None)],
            2,
        );
        assert_eq!(titles(&out), vec!["b", "a"]);
        assert!(prefilter(vec![item("a", None)], 0).is_empty());
    }
}
