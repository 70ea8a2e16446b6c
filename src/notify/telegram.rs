use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;

/// Retry delays stop doubling after this many steps.
const MAX_BACKOFF_EXP: u32 = 10;

/// Bot API `sendMessage`, one call per message, HTML parse mode.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, api_base: String) -> Self {
        Self {
            bot_token,
            chat_id,
            api_base,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }

    async fn send_one(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let url = self.endpoint();

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            // The token is part of the URL; keep it out of error messages.
            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!(
                        "Telegram HTTP error: {}",
                        e.status().map(|s| s.as_u16()).unwrap_or_default()
                    ),
                },
                Err(e) => anyhow!("Telegram request failed: {}", e.without_url()),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "telegram send retry");
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}

/// 500ms, doubling per failed attempt.
fn backoff(attempt: u8) -> Duration {
    let exp = u32::from(attempt.saturating_sub(1)).min(MAX_BACKOFF_EXP);
    Duration::from_millis(500u64 << exp)
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, messages: &[String]) -> Result<()> {
        for (i, m) in messages.iter().enumerate() {
            self.send_one(m)
                .await
                .map_err(|e| e.context(format!("telegram message {}/{}", i + 1, messages.len())))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
