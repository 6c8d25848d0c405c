//! Persistence layer: the `Store` interface the pipeline runs against, the
//! Postgres implementation, and the staging-table bulk upsert engine.

pub mod bulk;
pub mod normalize;
pub mod pg;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::{
    AdvisorFilter, AdvisorRecord, Answer, Brochure, ComputedMetrics, CrsFiling, ExtractionRun,
    FilingSnapshot, Owner, PrivateFund,
};
use crate::services::documents::SectionIndexRow;

pub use pg::PgStore;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid upsert configuration: {0}")]
    Validation(String),

    #[error("operation cancelled")]
    Cancelled,
}

// ============================================================================
// Relationship rows
// ============================================================================

/// One entity relationship extracted from answers. Deduplicated on the
/// normalized name (plus relationship type where applicable).
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRow {
    pub crd_number: i64,
    pub entity_name: String,
    pub normalized_name: String,
    pub relationship_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipRows {
    pub custodians: Vec<RelationshipRow>,
    pub bd_affiliations: Vec<RelationshipRow>,
    pub service_providers: Vec<RelationshipRow>,
}

impl RelationshipRows {
    pub fn is_empty(&self) -> bool {
        self.custodians.is_empty()
            && self.bd_affiliations.is_empty()
            && self.service_providers.is_empty()
    }
}

// ============================================================================
// Store interface
// ============================================================================

/// Everything the extraction pipeline reads and writes. Every method observes
/// the cancellation token and returns promptly once it is tripped.
#[async_trait]
pub trait Store: Send + Sync {
    // Loads
    async fn load_advisor(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Option<AdvisorRecord>, StoreError>;

    /// Brochure filings, most recent first.
    async fn load_brochures(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<Brochure>, StoreError>;

    /// CRS filings, most recent first.
    async fn load_crs(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<CrsFiling>, StoreError>;

    async fn load_owners(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<Owner>, StoreError>;

    async fn load_funds(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<PrivateFund>, StoreError>;

    /// Historical filing snapshots, oldest first.
    async fn load_filing_history(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<FilingSnapshot>, StoreError>;

    async fn list_advisors(
        &self,
        cancel: &CancellationToken,
        filter: &AdvisorFilter,
    ) -> Result<Vec<i64>, StoreError>;

    // Run lifecycle
    async fn create_run(
        &self,
        cancel: &CancellationToken,
        run: &ExtractionRun,
    ) -> Result<(), StoreError>;

    async fn complete_run(
        &self,
        cancel: &CancellationToken,
        run: &ExtractionRun,
    ) -> Result<(), StoreError>;

    async fn fail_run(
        &self,
        cancel: &CancellationToken,
        run_id: &str,
        message: &str,
    ) -> Result<(), StoreError>;

    // Writes
    async fn write_advisor_answers(
        &self,
        cancel: &CancellationToken,
        answers: &[Answer],
    ) -> Result<u64, StoreError>;

    async fn write_fund_answers(
        &self,
        cancel: &CancellationToken,
        answers: &[Answer],
    ) -> Result<u64, StoreError>;

    async fn write_computed_metrics(
        &self,
        cancel: &CancellationToken,
        metrics: &ComputedMetrics,
    ) -> Result<(), StoreError>;

    async fn write_section_index(
        &self,
        cancel: &CancellationToken,
        rows: &[SectionIndexRow],
    ) -> Result<u64, StoreError>;

    async fn write_relationships(
        &self,
        cancel: &CancellationToken,
        rows: &RelationshipRows,
    ) -> Result<u64, StoreError>;

    /// Copy the advisor's current answers (advisor and fund scope) into the
    /// append-only history table, tagged with the superseding run id.
    async fn archive_existing_answers(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
        superseded_by: &str,
    ) -> Result<u64, StoreError>;

    async fn refresh_materialized_view(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError>;
}
