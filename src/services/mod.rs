//! Service layer: document assembly, structured bypass, the LLM dispatch
//! stack, the extraction orchestrator, and the metrics computer.

pub mod bypass;
pub mod documents;
pub mod extraction;
pub mod llm;
pub mod metrics;

pub use extraction::{
    CostTracker, ExtractError, ExtractionOptions, FleetRunner, FleetSummary, Orchestrator,
    PricingTable, TierModels,
};
pub use llm::{AnthropicClient, LlmClient};
