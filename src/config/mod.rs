// src/config/mod.rs
//! Agent configuration (TOML). Provider sections are closed tagged enums;
//! each variant maps to one factory branch.

pub mod ai;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub use ai::{LlmConfig, LlmProviderConfig};

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

fn default_window_days() -> u32 {
    7
}
fn default_max_results() -> usize {
    30
}
fn default_prefilter_max() -> usize {
    25
}
fn default_report_size() -> usize {
    10
}
fn default_newsapi_endpoint() -> String {
    "https://newsapi.org/v2/everything".to_string()
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    /// Topic description handed to the ranker.
    #[serde(default)]
    pub description: String,
    pub query: String,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Upper bound asked from the search provider.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Items allowed into the ranking call.
    #[serde(default = "default_prefilter_max")]
    pub prefilter_max: usize,
    /// Items shown in the final report.
    #[serde(default = "default_report_size")]
    pub report_size: usize,
    /// Run every N seconds; `None` runs once.
    #[serde(default)]
    pub schedule_secs: Option<u64>,
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchConfig {
    /// RSS 2.0 feeds filtered locally by the query terms.
    Rss { feeds: Vec<String> },
    /// newsapi.org `/v2/everything`.
    Newsapi {
        /// "ENV" means: read from NEWSAPI_KEY
        api_key: String,
        #[serde(default = "default_newsapi_endpoint")]
        endpoint: String,
        #[serde(default)]
        language: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeliveryConfig {
    Telegram {
        /// "ENV" means: read from TELEGRAM_BOT_TOKEN
        bot_token: String,
        chat_id: String,
        #[serde(default = "default_telegram_api_base")]
        api_base: String,
    },
    Email {
        smtp_host: String,
        #[serde(default = "default_smtp_port")]
        smtp_port: u16,
        smtp_user: String,
        /// "ENV" means: read from SMTP_PASS
        smtp_pass: String,
        from: String,
        to: String,
    },
    Stdout,
}

/// `"ENV"` reads `default_var`; `"env:NAME"` reads `NAME`; anything else is literal.
pub fn resolve_secret(raw: &str, default_var: &str) -> Result<String> {
    let t = raw.trim();
    let var = if t.eq_ignore_ascii_case("env") {
        default_var
    } else if let Some(name) = t.strip_prefix("env:") {
        name.trim()
    } else {
        return Ok(raw.to_string());
    };
    env::var(var).map_err(|_| anyhow!("Missing {var} env var"))
}

impl AgentConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading agent config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("loading {}", path.display()))
    }

    /// Parse, resolve secrets, validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AgentConfig = toml::from_str(s).context("parsing agent config")?;
        cfg.resolve_secrets()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_secrets(&mut self) -> Result<()> {
        if let SearchConfig::Newsapi { api_key, .. } = &mut self.search {
            *api_key = resolve_secret(api_key, "NEWSAPI_KEY")?;
        }
        match &mut self.delivery {
            DeliveryConfig::Telegram { bot_token, .. } => {
                *bot_token = resolve_secret(bot_token, "TELEGRAM_BOT_TOKEN")?;
            }
            DeliveryConfig::Email { smtp_pass, .. } => {
                *smtp_pass = resolve_secret(smtp_pass, "SMTP_PASS")?;
            }
            DeliveryConfig::Stdout => {}
        }
        self.llm.resolve_secrets()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("agent name must not be empty");
        }
        if self.query.trim().is_empty() {
            bail!("query must not be empty");
        }
        if self.window_days == 0 {
            bail!("window_days must be >= 1");
        }
        if self.max_results == 0 || self.prefilter_max == 0 || self.report_size == 0 {
            bail!("max_results, prefilter_max and report_size must be >= 1");
        }
        if let SearchConfig::Rss { feeds } = &self.search {
            if feeds.is_empty() {
                bail!("rss search needs at least one feed");
            }
        }
        if self.schedule_secs == Some(0) {
            bail!("schedule_secs must be >= 1 when set");
        }
        Ok(())
    }
}

/// Resolve the config path: explicit arg, then $DIGEST_CONFIG_PATH, then the default.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
