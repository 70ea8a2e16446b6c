// src/scheduler.rs
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::pipeline::Pipeline;

/// Run the pipeline every `every`, starting immediately. A failed run is
/// logged and the loop keeps going. `max_runs` bounds the loop (tests); `None`
/// runs until the task is cancelled. Returns the number of successful runs.
pub async fn run_periodically(
    pipeline: &Pipeline,
    every: Duration,
    max_runs: Option<usize>,
) -> usize {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut runs = 0usize;
    let mut ok = 0usize;
    loop {
        if max_runs.is_some_and(|m| runs >= m) {
            return ok;
        }
        ticker.tick().await;
        runs += 1;
        match pipeline.run_once(Utc::now()).await {
            Ok(summary) => {
                ok += 1;
                tracing::info!(run = runs, shown = summary.shown, "scheduled run finished");
            }
            Err(e) => {
                tracing::error!(run = runs, error = ?e, "scheduled run failed");
            }
        }
    }
}
