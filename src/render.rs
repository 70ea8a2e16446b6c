// src/render.rs
//! Report → chat messages (Telegram-flavoured HTML).
//!
//! Items are rendered to self-contained blocks and packed greedily into
//! messages of at most [`MESSAGE_CHAR_LIMIT`] characters. A block is never
//! split; the footer always closes the last message, or becomes its own
//! message when it does not fit.

use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::types::{RankedItem, Report};

pub const MESSAGE_CHAR_LIMIT: usize = 4096;
/// Cap for the snippet-derived bullet used when the ranker gave none.
pub const FALLBACK_BULLET_CHARS: usize = 200;
const BLOCK_SEPARATOR: &str = "\n\n";

pub fn render(report: &Report) -> Vec<String> {
    render_with_limit(report, MESSAGE_CHAR_LIMIT)
}

/// Same as [`render`] with a custom budget (tests, other channels).
pub fn render_with_limit(report: &Report, limit: usize) -> Vec<String> {
    let sep_len = BLOCK_SEPARATOR.chars().count();
    let mut messages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let blocks = report
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| fit_item(i + 1, item, limit))
        .chain(std::iter::once(fit_footer(report, limit)));

    for block in blocks {
        let block_len = block.chars().count();
        if current.is_empty() {
            current = block;
            current_len = block_len;
        } else if current_len + sep_len + block_len <= limit {
            current.push_str(BLOCK_SEPARATOR);
            current.push_str(&block);
            current_len += sep_len + block_len;
        } else {
            messages.push(std::mem::replace(&mut current, block));
            current_len = block_len;
        }
    }
    messages.push(current);
    messages
}

/// One numbered item:
/// title link, 0-2 bullets, optional date line, italic rationale.
pub fn render_item(rank: usize, item: &RankedItem) -> String {
    let r = &item.result;
    assemble_item(
        rank,
        &r.url,
        r.title.trim(),
        &item_bullets(item),
        date_line(item).as_deref(),
        item.rationale.trim(),
    )
}

/// [`render_item`] shrunk to `limit` chars. Text is cut before it is escaped
/// so tags and entities stay whole: the title is shortened first, then the
/// rationale, bullets and date line are dropped in turn. A link that cannot
/// fit on its own degrades to a plain-text title.
fn fit_item(rank: usize, item: &RankedItem, limit: usize) -> String {
    let block = render_item(rank, item);
    if block.chars().count() <= limit {
        return block;
    }

    let r = &item.result;
    let title = r.title.trim();
    let bullets = item_bullets(item);
    let date = date_line(item);
    let rationale = item.rationale.trim();
    let none: &[String] = &[];
    let layouts = [
        (bullets.as_slice(), date.as_deref(), rationale),
        (bullets.as_slice(), date.as_deref(), ""),
        (none, date.as_deref(), ""),
        (none, None, ""),
    ];
    for (bullets, date, rationale) in layouts {
        let fitted = shorten_to_fit(title, limit, |t| {
            assemble_item(rank, &r.url, t, bullets, date, rationale)
        });
        if let Some(fitted) = fitted {
            return fitted;
        }
    }
    shorten_to_fit(title, limit, |t| format!("{rank}. {}", encode_text(t))).unwrap_or_default()
}

fn assemble_item(
    rank: usize,
    url: &str,
    title: &str,
    bullets: &[String],
    date: Option<&str>,
    rationale: &str,
) -> String {
    let mut lines = Vec::with_capacity(3 + bullets.len());
    lines.push(format!(
        "{rank}. <b><a href=\"{}\">{}</a></b>",
        encode_double_quoted_attribute(url),
        encode_text(title)
    ));
    for b in bullets {
        lines.push(format!("• {}", encode_text(b)));
    }
    if let Some(date) = date {
        lines.push(date.to_string());
    }
    if !rationale.is_empty() {
        lines.push(format!("<i>{}</i>", encode_text(rationale)));
    }
    lines.join("\n")
}

/// Ranker bullets, or the first snippet sentence when there are none.
fn item_bullets(item: &RankedItem) -> Vec<String> {
    if !item.summary_bullets.is_empty() {
        return item.summary_bullets.clone();
    }
    let fallback = first_sentence(&item.result.snippet, FALLBACK_BULLET_CHARS);
    if fallback.is_empty() {
        Vec::new()
    } else {
        vec![fallback]
    }
}

/// Already escaped.
fn date_line(item: &RankedItem) -> Option<String> {
    let r = &item.result;
    let date = r.published_at?.format("%Y-%m-%d");
    let source = r.source_name.trim();
    Some(if source.is_empty() {
        format!("📅 {date}")
    } else {
        format!("📅 {date} · {}", encode_text(source))
    })
}

pub fn render_footer(report: &Report) -> String {
    footer_with_name(report, report.agent_name.trim())
}

fn fit_footer(report: &Report, limit: usize) -> String {
    let footer = render_footer(report);
    if footer.chars().count() <= limit {
        return footer;
    }
    shorten_to_fit(report.agent_name.trim(), limit, |name| {
        footer_with_name(report, name)
    })
    .unwrap_or(footer)
}

fn footer_with_name(report: &Report, name: &str) -> String {
    format!(
        "{} | window: {}d | {}\nFetched: {} → deduped: {} → shown: {}",
        encode_text(name),
        report.window_days,
        report.run_at.format("%Y-%m-%d %H:%M UTC"),
        report.fetched_count,
        report.deduped_count,
        report.items.len()
    )
}

/// Longest `text` prefix (ellipsized when cut) for which `build` stays within
/// `limit` chars. `None` when even a bare ellipsis does not fit.
fn shorten_to_fit<F>(text: &str, limit: usize, build: F) -> Option<String>
where
    F: Fn(&str) -> String,
{
    let fits = |s: &String| s.chars().count() <= limit;
    let whole = build(text);
    if fits(&whole) {
        return Some(whole);
    }

    let cut = |n: usize| -> String {
        let end = text.char_indices().nth(n).map_or(text.len(), |(i, _)| i);
        build(&format!("{}…", text[..end].trim_end()))
    };
    // Output length grows with n; find the largest n in [0, chars) that fits.
    let (mut lo, mut hi) = (0usize, text.chars().count());
    let mut best = None;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let candidate = cut(mid);
        if fits(&candidate) {
            best = Some(candidate);
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    best
}

/// First sentence of `text` (whitespace collapsed), cut to `max_chars`.
pub fn first_sentence(text: &str, max_chars: usize) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    static RE_SENTENCE: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    let re_sentence =
        RE_SENTENCE.get_or_init(|| Regex::new(r"[.!?](\s|$)").expect("static regex"));

    let collapsed = re_ws.replace_all(text.trim(), " ");
    let sentence = match re_sentence.find(&collapsed) {
        // keep the punctuation, drop the trailing space
        Some(m) => &collapsed[..m.start() + 1],
        None => &collapsed[..],
    };
    sentence.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchResult;
    use chrono::{TimeZone, Utc};

    fn ranked(title: &str, bullets: &[&str], dated: bool) -> RankedItem {
        RankedItem {
            result: SearchResult {
                title: title.into(),
                url: "https://example.test/a?x=1&y=2".into(),
                snippet: "First sentence here. Second one follows.".into(),
                published_at: dated.then(|| Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()),
                source_name: "Example".into(),
            },
            score: 0.9,
            rationale: "Directly on topic & timely".into(),
            summary_bullets: bullets.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn report(items: Vec<RankedItem>) -> Report {
        let n = items.len();
        Report {
            agent_name: "Rust <weekly>".into(),
            query: "rust".into(),
            window_days: 7,
            run_at: Utc.with_ymd_and_hms(2025, 9, 6, 9, 30, 0).unwrap(),
            items,
            fetched_count: n + 4,
            deduped_count: n + 1,
        }
    }

    #[test]
    fn item_block_escapes_and_formats() {
        let out = render_item(1, &ranked("A <b> & C", &["one", "two"], true));
        assert_eq!(
            out,
            "1. <b><a href=\"https://example.test/a?x=1&amp;y=2\">A &lt;b&gt; &amp; C</a></b>\n\
             • one\n\
             • two\n\
             📅 2025-09-06 · Example\n\
             <i>Directly on topic &amp; timely</i>"
        );
    }

    #[test]
    fn fallback_bullet_comes_from_snippet_and_date_line_is_optional() {
        let out = render_item(3, &ranked("T", &[], false));
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[1], "• First sentence here.");
        assert!(!out.contains("📅"));
    }

    #[test]
    fn empty_report_is_footer_only() {
        let msgs = render(&report(vec![]));
        assert_eq!(msgs.len(), 1);
        assert_eq!(
            msgs[0],
            "Rust &lt;weekly&gt; | window: 7d | 2025-09-06 09:30 UTC\n\
             Fetched: 4 → deduped: 1 → shown: 0"
        );
    }

    #[test]
    fn footer_moves_to_own_message_when_it_does_not_fit() {
        let r = report(vec![ranked("T", &["b"], false)]);
        let item_len = render_item(1, &r.items[0]).chars().count();
        let msgs = render_with_limit(&r, item_len + 5);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1], render_footer(&r));
    }

    #[test]
    fn first_sentence_handles_edge_cases() {
        assert_eq!(first_sentence("No terminator here", 200), "No terminator here");
        assert_eq!(first_sentence("  Multi\n line.  Next ", 200), "Multi line.");
        assert_eq!(first_sentence("v1.2 released! Yay", 200), "v1.2 released!");
        assert_eq!(first_sentence(&"x".repeat(300), 200).chars().count(), 200);
        assert_eq!(first_sentence("", 200), "");
    }

    /// Every `&` opens a whole entity.
    fn entities_are_whole(s: &str) -> bool {
        s.match_indices('&').all(|(i, _)| {
            ["&amp;", "&lt;", "&gt;", "&quot;"]
                .iter()
                .any(|e| s[i..].starts_with(e))
        })
    }

    #[test]
    fn oversized_block_is_shortened_without_breaking_markup() {
        let mut big = ranked(&"Rust & <tokio> ".repeat(40), &["a & b"], true);
        big.rationale = "why & how ".repeat(30);
        let limit = 160;
        let msgs = render_with_limit(&report(vec![big]), limit);
        let item = &msgs[0];

        assert!(msgs.iter().all(|m| m.chars().count() <= limit));
        assert!(item.starts_with("1. <b><a href=\"https://example.test/a?x=1&amp;y=2\">Rust &amp;"));
        assert!(item.contains("…</a></b>"));
        assert_eq!(item.matches("<i>").count(), item.matches("</i>").count());
        assert!(msgs.iter().all(|m| entities_are_whole(m)));
    }

    #[test]
    fn unfittable_link_degrades_to_plain_title() {
        let mut big = ranked("Short & sweet", &[], false);
        big.result.url = format!("https://example.test/{}", "p".repeat(200));
        let msgs = render_with_limit(&report(vec![big]), 100);
        assert_eq!(msgs[0], "1. Short &amp; sweet");
        assert!(msgs.iter().all(|m| m.chars().count() <= 100));
    }

    #[test]
    fn block_that_fits_is_untouched() {
        let item = ranked("A & B", &["one"], true);
        let full = render_item(1, &item);
        let msgs = render_with_limit(&report(vec![item]), full.chars().count());
        assert_eq!(msgs[0], full);
    }
}
