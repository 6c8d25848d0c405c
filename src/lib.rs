//! Advscope Library
//!
//! ADV intelligence extraction engine: a tiered LLM pipeline that answers a
//! fixed bank of due-diligence questions against each registered investment
//! adviser's filing corpus and persists typed answers plus derived metrics.

pub mod config;
pub mod models;
pub mod questions;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use models::{Answer, AnswerValue, ExtractionRun, RunStatus, Scope};
pub use services::{
    AnthropicClient, CostTracker, ExtractionOptions, FleetRunner, FleetSummary, LlmClient,
    Orchestrator, PricingTable, TierModels,
};
pub use store::{PgStore, Store, StoreError};
