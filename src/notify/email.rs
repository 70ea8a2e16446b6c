use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Notifier;

/// Sends the whole digest as one HTML mail.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(
        host: &str,
        port: u16,
        user: String,
        pass: String,
        from: &str,
        to: &str,
    ) -> Result<Self> {
        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("invalid smtp_host {host}"))?
            .port(port)
            .credentials(creds)
            .build();

        let from = from.parse().context("invalid email `from`")?;
        let to = to.parse().context("invalid email `to`")?;
        Ok(Self { mailer, from, to })
    }
}

/// Subject: first line of the footer (last message), markup-decoded.
pub fn subject_for(messages: &[String]) -> String {
    let footer_line = messages
        .last()
        .and_then(|m| m.rsplit("\n\n").next())
        .and_then(|block| block.lines().next())
        .unwrap_or("Topic digest");
    html_escape::decode_html_entities(footer_line).into_owned()
}

/// Chat markup is already HTML; only line breaks need translating.
pub fn html_body(messages: &[String]) -> String {
    let parts: Vec<String> = messages.iter().map(|m| m.replace('\n', "<br>\n")).collect();
    format!("<html><body>\n{}\n</body></html>", parts.join("<br>\n<br>\n"))
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, messages: &[String]) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject_for(messages))
            .header(header::ContentType::TEXT_HTML)
            .body(html_body(messages))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_comes_from_footer() {
        let msgs = vec![
            "1. item".to_string(),
            "2. item\n\nR &amp; D | window: 7d | 2025-09-06 09:30 UTC\nFetched: 3 → deduped: 2 → shown: 2"
                .to_string(),
        ];
        assert_eq!(subject_for(&msgs), "R & D | window: 7d | 2025-09-06 09:30 UTC");
        assert_eq!(subject_for(&[]), "Topic digest");
    }

    #[test]
    fn body_translates_newlines() {
        let body = html_body(&["a\nb".to_string(), "c".to_string()]);
        assert!(body.contains("a<br>\nb<br>\n<br>\nc"));
    }
}
