//! AI adapter: text-generation provider abstraction used by the ranker.
//!
//! Providers return the raw completion text. Interpreting it (JSON shape,
//! fallback policy) belongs to `analyze::ranker`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ai::{LlmConfig, LlmProviderConfig};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Why a completion did not produce text.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM is disabled in config")]
    Disabled,
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("LLM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM response carried no text")]
    EmptyResponse,
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
}

pub type LlmFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// Trait object used by the ranker and tests.
pub trait LlmClient: Send + Sync {
    /// Send one system + user prompt pair, return the completion text.
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> LlmFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynLlmClient = Arc<dyn LlmClient>;

/// Factory: one branch per configured provider.
pub fn build_llm_client(config: &LlmConfig) -> Result<DynLlmClient, LlmError> {
    let timeout = config.timeout();
    match &config.provider {
        LlmProviderConfig::Openai {
            api_key,
            model,
            endpoint,
        } => Ok(Arc::new(OpenAiProvider::new(
            api_key.clone(),
            model.clone(),
            endpoint.clone(),
            timeout,
        )?)),
        LlmProviderConfig::Anthropic {
            api_key,
            model,
            endpoint,
        } => Ok(Arc::new(AnthropicProvider::new(
            api_key.clone(),
            model.clone(),
            endpoint.clone(),
            timeout,
        )?)),
        LlmProviderConfig::Disabled => Ok(Arc::new(DisabledClient)),
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("topic-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()?)
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Status {
        status: status.as_u16(),
        body: body.chars().take(300).collect(),
    })
}

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 2048;

// ------------------------------------------------------------
// OpenAI-compatible chat completions
// ------------------------------------------------------------

pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model,
            endpoint,
        })
    }
}

impl LlmClient for OpenAiProvider {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> LlmFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await?;
            let body: Resp = error_for_status(resp).await?.json().await?;
            body.choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|s| !s.trim().is_empty())
                .ok_or(LlmError::EmptyResponse)
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Anthropic messages API
// ------------------------------------------------------------

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        model: String,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model,
            endpoint,
        })
    }
}

impl LlmClient for AnthropicProvider {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> LlmFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                system: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                content: Vec<Block>,
            }
            #[derive(Deserialize)]
            struct Block {
                #[serde(rename = "type")]
                kind: String,
                #[serde(default)]
                text: String,
            }

            let req = Req {
                model: &self.model,
                system,
                messages: vec![Msg {
                    role: "user",
                    content: user,
                }],
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&req)
                .send()
                .await?;
            let body: Resp = error_for_status(resp).await?.json().await?;
            let text: String = body
                .content
                .into_iter()
                .filter(|b| b.kind == "text")
                .map(|b| b.text)
                .collect();
            if text.trim().is_empty() {
                Err(LlmError::EmptyResponse)
            } else {
                Ok(text)
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

// ------------------------------------------------------------
// Disabled + mock clients
// ------------------------------------------------------------

/// Always fails with `LlmError::Disabled`; the ranker then falls back.
pub struct DisabledClient;

impl LlmClient for DisabledClient {
    fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> LlmFuture<'a> {
        Box::pin(async { Err(LlmError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail,
    Hang,
}

/// Scripted client for tests/local runs. Counts calls and keeps the last user prompt.
pub struct MockClient {
    reply: MockReply,
    calls: AtomicUsize,
    last_user: Mutex<Option<String>>,
}

impl MockClient {
    fn with(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_user: Mutex::new(None),
        }
    }

    /// Replies with `text` on every call.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with(MockReply::Text(text.into()))
    }

    /// Fails every call with an HTTP 503.
    pub fn failing() -> Self {
        Self::with(MockReply::Fail)
    }

    /// Never answers; exercises the ranker timeout.
    pub fn hanging() -> Self {
        Self::with(MockReply::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user.lock().ok().and_then(|g| g.clone())
    }
}

impl LlmClient for MockClient {
    fn complete<'a>(&'a self, _system: &'a str, user: &'a str) -> LlmFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut g) = self.last_user.lock() {
            *g = Some(user.to_string());
        }
        let reply = self.reply.clone();
        Box::pin(async move {
            match reply {
                MockReply::Text(t) => Ok(t),
                MockReply::Fail => Err(LlmError::Status {
                    status: 503,
                    body: "mock outage".into(),
                }),
                MockReply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(LlmError::EmptyResponse)
                }
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_refuses() {
        let res = DisabledClient.complete("sys", "user").await;
        assert!(matches!(res, Err(LlmError::Disabled)));
    }

    #[tokio::test]
    async fn mock_counts_calls_and_keeps_prompt() {
        let m = MockClient::text("[]");
        assert_eq!(m.complete("s", "first").await.unwrap(), "[]");
        assert_eq!(m.complete("s", "second").await.unwrap(), "[]");
        assert_eq!(m.calls(), 2);
        assert_eq!(m.last_user_prompt().as_deref(), Some("second"));
    }

    #[test]
    fn factory_builds_disabled() {
        let cfg = LlmConfig::default();
        let client = build_llm_client(&cfg).unwrap();
        assert_eq!(client.provider_name(), "disabled");
    }
}
