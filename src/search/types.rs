// src/search/types.rs
use anyhow::Result;

pub use crate::types::SearchResult;

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Up to `max_results` items published within the last `window_days`.
    async fn search(
        &self,
        query: &str,
        window_days: u32,
        max_results: usize,
    ) -> Result<Vec<SearchResult>>;
    fn name(&self) -> &'static str;
}
