// src/analyze/mod.rs
//! Refinement stages between search and rendering:
//! dedup → recency pre-filter → LLM ranking.

pub mod ai_adapter;
pub mod dedup;
pub mod prompt;
pub mod ranker;
pub mod recency;

// Re-export convenient entry points.
pub use crate::analyze::dedup::deduplicate;
pub use crate::analyze::ranker::{DegradeReason, RankOutcome, Ranker};
pub use crate::analyze::recency::prefilter;
