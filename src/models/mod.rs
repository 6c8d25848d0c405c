//! Core data models for the extraction engine.

pub mod advisor;
pub mod answer;
pub mod metrics;

pub use advisor::{
    AdvisorDocs, AdvisorFilter, AdvisorRecord, Brochure, ClientTypeEntry, CrsFiling,
    FilingSnapshot, Owner, PrivateFund,
};
pub use answer::{Answer, AnswerValue, ExtractionRun, RunStatus, Scope};
pub use metrics::ComputedMetrics;
