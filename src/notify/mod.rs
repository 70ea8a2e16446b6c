// src/notify/mod.rs
//! Delivery of rendered messages. Failures are returned to the caller, never
//! swallowed: a report that was not sent is a failed run.

pub mod email;
pub mod stdout;
pub mod telegram;

use anyhow::Result;

use crate::config::DeliveryConfig;

pub use email::EmailNotifier;
pub use stdout::StdoutNotifier;
pub use telegram::TelegramNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver all messages, in order.
    async fn send(&self, messages: &[String]) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Factory: one branch per `[delivery] kind`.
pub fn build_notifier(cfg: &DeliveryConfig) -> Result<Box<dyn Notifier>> {
    match cfg {
        DeliveryConfig::Telegram {
            bot_token,
            chat_id,
            api_base,
        } => Ok(Box::new(TelegramNotifier::new(
            bot_token.clone(),
            chat_id.clone(),
            api_base.clone(),
        ))),
        DeliveryConfig::Email {
            smtp_host,
            smtp_port,
            smtp_user,
            smtp_pass,
            from,
            to,
        } => Ok(Box::new(EmailNotifier::new(
            smtp_host,
            *smtp_port,
            smtp_user.clone(),
            smtp_pass.clone(),
            from,
            to,
        )?)),
        DeliveryConfig::Stdout => Ok(Box::new(StdoutNotifier)),
    }
}
