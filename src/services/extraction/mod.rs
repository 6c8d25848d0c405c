//! Extraction core: cost tracking, answer merging, the per-advisor tiered
//! orchestrator, and the fleet runner.

pub mod cost;
pub mod fleet;
pub mod merge;
pub mod orchestrator;
pub mod relationships;

pub use cost::{AdvisorCost, CostTracker, PricingTable, TierRates};
pub use fleet::{FleetRunner, FleetSummary, estimate_batch_cost};
pub use merge::merge_answers;
pub use orchestrator::{
    ExtractError, ExtractionOptions, Orchestrator, RunSummary, TierModels,
};
