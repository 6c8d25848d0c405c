//! LLM layer: provider wire types, client trait + Anthropic adapter, tier
//! prompts, and the batch dispatcher.
//!
//! The dispatcher is the only entry point the orchestrator uses; everything
//! else is plumbing underneath it.

mod client;
mod models;

pub mod dispatch;
pub mod prompts;

pub use client::{AnthropicClient, LlmClient};
pub use dispatch::{BatchItem, DispatchOutcome, TierConfig, build_items, dispatch_tier};
pub use models::*;
