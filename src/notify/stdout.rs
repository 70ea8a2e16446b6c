use anyhow::Result;
use std::io::{self, Write};

use super::Notifier;

/// Prints messages for dry runs and local use.
pub struct StdoutNotifier;

fn print_messages(messages: &[String]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, m) in messages.iter().enumerate() {
        writeln!(
            out,
            "----- message {}/{} ({} chars) -----",
            i + 1,
            messages.len(),
            m.chars().count()
        )?;
        writeln!(out, "{m}")?;
    }
    out.flush()
}

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, messages: &[String]) -> Result<()> {
        print_messages(messages)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
