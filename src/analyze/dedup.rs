// src/analyze/dedup.rs
//! Deduplication of raw search results.
//!
//! Two passes, both order-preserving:
//! 1. **URL identity**: scheme/host lowercased, leading `www.` dropped, query,
//!    fragment and trailing slash stripped. First occurrence wins.
//! 2. **Title similarity**: Ratcliff/Obershelp ratio (`2·M / T`) over the raw
//!    title text. A title whose ratio against an already kept title exceeds
//!    [`TITLE_SIMILARITY_THRESHOLD`] is dropped.
//!
//! Titles are compared case-sensitively without punctuation folding, so
//! "Fed Cuts Rates" and "fed cuts rates" can both survive.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use crate::types::SearchResult;

pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Canonical form used as the identity of a result.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(u) if u.host_str().is_some() => {
            let host = u.host_str().unwrap_or_default().to_ascii_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host);
            let port = u.port().map(|p| format!(":{p}")).unwrap_or_default();
            let path = u.path().trim_end_matches('/');
            format!("{}://{}{}{}", u.scheme(), host, port, path)
        }
        _ => normalize_unparsed(trimmed),
    }
}

/// Best-effort variant for strings `url` refuses (relative links, junk).
fn normalize_unparsed(raw: &str) -> String {
    let cut = raw.find(['?', '#']).map(|i| &raw[..i]).unwrap_or(raw);
    let cut = cut.trim_end_matches('/');
    let (scheme, rest) = match cut.split_once("://") {
        Some((s, r)) => (Some(s.to_ascii_lowercase()), r),
        None => (None, cut),
    };
    let (host, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    match scheme {
        Some(s) => format!("{s}://{host}{path}"),
        None => format!("{host}{path}"),
    }
}

/// Sequence similarity in `0.0..=1.0`, computed like Python's
/// `difflib.SequenceMatcher.ratio` without junk heuristics.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

/// Total size of matching blocks: take the longest common block, then recurse
/// on the pieces to its left and right.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest block `a[i..i+k] == b[j..j+k]` inside the given window.
/// Ties resolve to the block ending earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    for (i, ca) in a.iter().enumerate().take(ahi).skip(alo) {
        for (off, cb) in b[blo..bhi].iter().enumerate() {
            if ca == cb {
                let k = prev[off] + 1;
                cur[off + 1] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = blo + off + 1 - k;
                    best_k = k;
                }
            } else {
                cur[off + 1] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (best_i, best_j, best_k)
}

/// Remove URL duplicates, then near-duplicate titles. Keeps input order.
pub fn deduplicate(results: Vec<SearchResult>) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }
    let input_len = results.len();

    let mut seen_urls: HashSet<String> = HashSet::with_capacity(results.len());
    let by_url: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| seen_urls.insert(normalize_url(&r.url)))
        .collect();
    let url_dupes = input_len - by_url.len();

    let mut kept: Vec<SearchResult> = Vec::with_capacity(by_url.len());
    for candidate in by_url {
        let near = kept.iter().find(|k| {
            similarity_ratio(&k.title, &candidate.title) > TITLE_SIMILARITY_THRESHOLD
        });
        match near {
            Some(k) => debug!(
                kept = %k.title,
                dropped = %candidate.title,
                "dedup: near-duplicate title"
            ),
            None => kept.push(candidate),
        }
    }

    debug!(
        input = input_len,
        url_dupes,
        title_dupes = input_len - url_dupes - kept.len(),
        kept = kept.len(),
        "dedup done"
    );
    kept
}
