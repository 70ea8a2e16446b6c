// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod search;
pub mod types;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::pipeline::{Pipeline, RunSummary};
pub use crate::render::render;
pub use crate::types::{RankedItem, Report, SearchResult};
