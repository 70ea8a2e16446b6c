// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::resolve_secret;

fn default_timeout_secs() -> u64 {
    30
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}
fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

/// `[llm]` table. `kind` selects the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(flatten)]
    pub provider: LlmProviderConfig,
    /// Upper bound for one ranking call; expiry triggers the fallback.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LlmProviderConfig {
    /// Any OpenAI-compatible chat completions endpoint.
    Openai {
        /// "ENV" means: read from OPENAI_API_KEY
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
    Anthropic {
        /// "ENV" means: read from ANTHROPIC_API_KEY
        api_key: String,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default = "default_anthropic_endpoint")]
        endpoint: String,
    },
    Disabled,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderConfig::Disabled,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Replace `"ENV"` / `"env:NAME"` placeholders with environment values.
    pub(crate) fn resolve_secrets(&mut self) -> anyhow::Result<()> {
        match &mut self.provider {
            LlmProviderConfig::Openai { api_key, .. } => {
                *api_key = resolve_secret(api_key, "OPENAI_API_KEY")?;
            }
            LlmProviderConfig::Anthropic { api_key, .. } => {
                *api_key = resolve_secret(api_key, "ANTHROPIC_API_KEY")?;
            }
            LlmProviderConfig::Disabled => {}
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        Ok(())
    }
}
