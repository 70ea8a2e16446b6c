use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::search::types::{SearchProvider, SearchResult};
use crate::search::{matches_query, normalize_text, query_terms, within_window};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let dt = OffsetDateTime::parse(ts.trim(), &Rfc2822).ok()?;
    DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0)
}

/// Parse one RSS 2.0 document into results matching `query` inside the window.
/// The channel title becomes `source_name`, falling back to `fallback_source`.
pub fn parse_feed(
    xml: &str,
    fallback_source: &str,
    query: &str,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<SearchResult>> {
    let t0 = std::time::Instant::now();
    let rss: Rss = from_str(&scrub_html_entities_for_xml(xml)).context("parsing rss xml")?;
    let source = rss
        .channel
        .title
        .as_deref()
        .map(normalize_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_source.to_string());
    let terms = query_terms(query);

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let (Some(title), Some(link)) = (it.title.as_deref(), it.link.as_deref()) else {
            continue;
        };
        let title = normalize_text(title);
        let url = link.trim().to_string();
        if title.is_empty() || url.is_empty() {
            continue;
        }
        let snippet = it.description.as_deref().map(normalize_text).unwrap_or_default();
        let published_at = it.pub_date.as_deref().and_then(parse_rfc2822);

        if !matches_query(&format!("{title} {snippet}"), &terms)
            || !within_window(published_at, window_days, now)
        {
            continue;
        }
        out.push(SearchResult {
            title,
            url,
            snippet,
            published_at,
            source_name: source.clone(),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("digest_rss_parse_ms").record(ms);
    Ok(out)
}

enum Mode {
    Fixture(Vec<String>),
    Http {
        urls: Vec<String>,
        client: reqwest::Client,
    },
}

/// Fetches every configured feed in order and filters items locally.
pub struct RssProvider {
    mode: Mode,
}

impl RssProvider {
    pub fn from_urls(urls: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("topic-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            mode: Mode::Http { urls, client },
        })
    }

    /// Serve already-downloaded feed documents (tests, offline runs).
    pub fn from_fixtures(docs: Vec<String>) -> Self {
        Self {
            mode: Mode::Fixture(docs),
        }
    }

    fn collect(
        docs: impl IntoIterator<Item = (String, String)>,
        query: &str,
        window_days: u32,
        max_results: usize,
    ) -> Vec<SearchResult> {
        let now = Utc::now();
        let mut out = Vec::new();
        for (origin, xml) in docs {
            match parse_feed(&xml, &origin, query, window_days, now) {
                Ok(mut v) => out.append(&mut v),
                Err(e) => {
                    tracing::warn!(error = ?e, feed = %origin, "rss feed skipped");
                    counter!("digest_search_errors_total").increment(1);
                }
            }
        }
        out.truncate(max_results);
        out
    }
}

#[async_trait]
impl SearchProvider for RssProvider {
    async fn search(
        &self,
        query: &str,
        window_days: u32,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        let docs: Vec<(String, String)> = match &self.mode {
            Mode::Fixture(docs) => docs
                .iter()
                .enumerate()
                .map(|(i, d)| (format!("fixture-{i}"), d.clone()))
                .collect(),
            Mode::Http { urls, client } => {
                let mut docs = Vec::with_capacity(urls.len());
                for url in urls {
                    let body = async {
                        client
                            .get(url)
                            .send()
                            .await?
                            .error_for_status()?
                            .text()
                            .await
                    }
                    .await;
                    match body {
                        Ok(b) => docs.push((url.clone(), b)),
                        Err(e) => {
                            tracing::warn!(error = ?e, feed = %url, "rss http error");
                            counter!("digest_search_errors_total").increment(1);
                        }
                    }
                }
                docs
            }
        };
        Ok(Self::collect(docs, query, window_days, max_results))
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
