//! newsapi.org `/v2/everything` client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::search::normalize_text;
use crate::search::types::{SearchProvider, SearchResult};

/// NewsAPI caps `pageSize` at 100.
const MAX_PAGE_SIZE: usize = 100;
/// Placeholder NewsAPI puts in articles pulled by the publisher.
const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Resp {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}
#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// Map a response body to results. An `"error"` status is an error.
pub fn parse_response(body: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let resp: Resp = serde_json::from_str(body).context("parsing newsapi response")?;
    if resp.status != "ok" {
        return Err(anyhow!(
            "newsapi error: {}",
            resp.message.unwrap_or_else(|| resp.status.clone())
        ));
    }
    let out = resp
        .articles
        .into_iter()
        .filter_map(|a| {
            let title = normalize_text(a.title.as_deref()?);
            let url = a.url?.trim().to_string();
            if title.is_empty() || title == REMOVED_MARKER || url.is_empty() {
                return None;
            }
            Some(SearchResult {
                title,
                url,
                snippet: a.description.as_deref().map(normalize_text).unwrap_or_default(),
                published_at: a
                    .published_at
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|d| d.with_timezone(&Utc)),
                source_name: a
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "newsapi".to_string()),
            })
        })
        .take(max_results)
        .collect();
    Ok(out)
}

pub struct NewsApiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    language: Option<String>,
}

impl NewsApiProvider {
    pub fn new(api_key: String, endpoint: String, language: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("topic-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building newsapi http client")?;
        Ok(Self {
            client,
            api_key,
            endpoint,
            language,
        })
    }
}

#[async_trait]
impl SearchProvider for NewsApiProvider {
    async fn search(
        &self,
        query: &str,
        window_days: u32,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        let from = (Utc::now() - ChronoDuration::days(i64::from(window_days)))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        let page_size = max_results.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut params = vec![
            ("q", query.to_string()),
            ("from", from),
            ("pageSize", page_size),
            ("sortBy", "publishedAt".to_string()),
        ];
        if let Some(lang) = &self.language {
            params.push(("language", lang.clone()));
        }

        let body = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .query(&params)
            .send()
            .await
            .context("newsapi get")?
            .text()
            .await
            .context("newsapi body")?;
        parse_response(&body, max_results)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
