//! Postgres-backed `Store`.
//!
//! Loads use plain `query_as`; every batch write goes through the staging
//! COPY upsert in `bulk`. Methods race their query against the cancellation
//! token so a tripped token returns promptly.

use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::{Arguments, PgPool};
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::models::{
    AdvisorFilter, AdvisorRecord, Answer, Brochure, ComputedMetrics, CrsFiling, ExtractionRun,
    FilingSnapshot, Owner, PrivateFund,
};
use crate::services::documents::SectionIndexRow;

use super::bulk::{Field, UpsertBatch, UpsertConfig, bulk_upsert, bulk_upsert_many};
use super::{RelationshipRow, RelationshipRows, Store, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Race a store operation against cancellation.
async fn guard<T, E>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, StoreError>
where
    E: Into<StoreError>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        result = fut => result.map_err(Into::into),
    }
}

// ============================================================================
// Upsert row builders
// ============================================================================

const ANSWER_COLUMNS: [&str; 13] = [
    "crd_number",
    "question_key",
    "value",
    "confidence",
    "tier",
    "reasoning",
    "source_doc",
    "source_section",
    "model",
    "input_tokens",
    "output_tokens",
    "run_id",
    "extracted_at",
];

fn answer_row(answer: &Answer) -> Vec<Field> {
    vec![
        Field::Int(answer.crd_number),
        Field::Text(answer.question_key.clone()),
        Field::Json(answer.value.to_json()),
        Field::Float(answer.confidence),
        Field::Int(answer.tier as i64),
        Field::Text(answer.reasoning.clone()),
        Field::Text(answer.source_doc.clone()),
        Field::Text(answer.source_section.clone()),
        Field::Text(answer.model.clone()),
        Field::Int(answer.input_tokens),
        Field::Int(answer.output_tokens),
        Field::Text(answer.run_id.clone()),
        Field::Timestamp(answer.extracted_at),
    ]
}

fn fund_answer_row(answer: &Answer, fund_id: &str) -> Vec<Field> {
    let mut row = answer_row(answer);
    row.insert(1, Field::Text(fund_id.to_string()));
    row
}

fn opt_int(value: Option<i64>) -> Field {
    value.map(Field::Int).unwrap_or(Field::Null)
}

fn opt_i32(value: Option<i32>) -> Field {
    value.map(|v| Field::Int(v as i64)).unwrap_or(Field::Null)
}

fn opt_float(value: Option<f64>) -> Field {
    value.map(Field::Float).unwrap_or(Field::Null)
}

fn relationship_batch(table: &str, rows: &[RelationshipRow]) -> UpsertBatch {
    UpsertBatch {
        config: UpsertConfig::new(
            table,
            &["crd_number", "entity_name", "normalized_name", "relationship_type"],
            &["crd_number", "normalized_name", "relationship_type"],
        ),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    Field::Int(r.crd_number),
                    Field::Text(r.entity_name.clone()),
                    Field::Text(r.normalized_name.clone()),
                    Field::Text(r.relationship_type.clone().unwrap_or_default()),
                ]
            })
            .collect(),
    }
}

// ============================================================================
// Store implementation
// ============================================================================

#[async_trait]
impl Store for PgStore {
    async fn load_advisor(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Option<AdvisorRecord>, StoreError> {
        guard(
            cancel,
            sqlx::query_as::<_, AdvisorRecord>("SELECT * FROM adv_advisors WHERE crd_number = $1")
                .bind(crd_number)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn load_brochures(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<Brochure>, StoreError> {
        guard(
            cancel,
            sqlx::query_as::<_, Brochure>(
                "SELECT * FROM adv_brochures WHERE crd_number = $1 ORDER BY filing_date DESC NULLS LAST",
            )
            .bind(crd_number)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn load_crs(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<CrsFiling>, StoreError> {
        guard(
            cancel,
            sqlx::query_as::<_, CrsFiling>(
                "SELECT * FROM adv_crs_filings WHERE crd_number = $1 ORDER BY filing_date DESC NULLS LAST",
            )
            .bind(crd_number)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn load_owners(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<Owner>, StoreError> {
        guard(
            cancel,
            sqlx::query_as::<_, Owner>(
                "SELECT * FROM adv_owners WHERE crd_number = $1 ORDER BY ownership_pct DESC NULLS LAST",
            )
            .bind(crd_number)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn load_funds(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<PrivateFund>, StoreError> {
        guard(
            cancel,
            sqlx::query_as::<_, PrivateFund>(
                "SELECT * FROM adv_private_funds WHERE crd_number = $1 ORDER BY gross_aum DESC NULLS LAST",
            )
            .bind(crd_number)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn load_filing_history(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
    ) -> Result<Vec<FilingSnapshot>, StoreError> {
        guard(
            cancel,
            sqlx::query_as::<_, FilingSnapshot>(
                "SELECT * FROM adv_filing_history WHERE crd_number = $1 ORDER BY filing_date ASC",
            )
            .bind(crd_number)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn list_advisors(
        &self,
        cancel: &CancellationToken,
        filter: &AdvisorFilter,
    ) -> Result<Vec<i64>, StoreError> {
        let mut sql = String::from("SELECT crd_number FROM adv_advisors WHERE 1=1");
        let mut args = PgArguments::default();
        let mut n = 0;

        if let Some(min_aum) = filter.min_aum {
            n += 1;
            sql.push_str(&format!(" AND total_aum >= ${}", n));
            args.add(min_aum);
        }
        if let Some(state) = &filter.state {
            n += 1;
            sql.push_str(&format!(" AND main_office_state = ${}", n));
            args.add(state.clone());
        }
        if filter.skip_extracted {
            sql.push_str(
                " AND crd_number NOT IN (SELECT crd_number FROM adv_extraction_runs WHERE status = 'complete')",
            );
        }
        sql.push_str(" ORDER BY total_aum DESC NULLS LAST");
        if let Some(limit) = filter.limit {
            n += 1;
            sql.push_str(&format!(" LIMIT ${}", n));
            args.add(limit);
        }

        guard(cancel, sqlx::query_scalar_with::<_, i64, _>(&sql, args).fetch_all(&self.pool)).await
    }

    async fn create_run(
        &self,
        cancel: &CancellationToken,
        run: &ExtractionRun,
    ) -> Result<(), StoreError> {
        guard(
            cancel,
            sqlx::query(
                r#"INSERT INTO adv_extraction_runs
                   (id, crd_number, scope, fund_id, status, started_at, tier_completed,
                    total_questions, answered, input_tokens, output_tokens, cost_usd)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
            )
            .bind(&run.id)
            .bind(run.crd_number)
            .bind(run.scope.as_str())
            .bind(&run.fund_id)
            .bind(run.status.as_str())
            .bind(run.started_at)
            .bind(run.tier_completed as i32)
            .bind(run.total_questions)
            .bind(run.answered)
            .bind(run.input_tokens)
            .bind(run.output_tokens)
            .bind(run.cost_usd)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn complete_run(
        &self,
        cancel: &CancellationToken,
        run: &ExtractionRun,
    ) -> Result<(), StoreError> {
        guard(
            cancel,
            sqlx::query(
                r#"UPDATE adv_extraction_runs SET
                   status = $2, completed_at = $3, tier_completed = $4,
                   total_questions = $5, answered = $6,
                   input_tokens = $7, output_tokens = $8, cost_usd = $9
                   WHERE id = $1"#,
            )
            .bind(&run.id)
            .bind(run.status.as_str())
            .bind(run.completed_at)
            .bind(run.tier_completed as i32)
            .bind(run.total_questions)
            .bind(run.answered)
            .bind(run.input_tokens)
            .bind(run.output_tokens)
            .bind(run.cost_usd)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn fail_run(
        &self,
        cancel: &CancellationToken,
        run_id: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        guard(
            cancel,
            sqlx::query(
                r#"UPDATE adv_extraction_runs SET
                   status = 'failed', completed_at = NOW(), error_message = $2
                   WHERE id = $1"#,
            )
            .bind(run_id)
            .bind(message)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn write_advisor_answers(
        &self,
        cancel: &CancellationToken,
        answers: &[Answer],
    ) -> Result<u64, StoreError> {
        let config = UpsertConfig::new(
            "adv_advisor_answers",
            &ANSWER_COLUMNS,
            &["crd_number", "question_key"],
        );
        let rows: Vec<Vec<Field>> = answers.iter().map(answer_row).collect();
        guard(cancel, bulk_upsert(&self.pool, &config, &rows)).await
    }

    async fn write_fund_answers(
        &self,
        cancel: &CancellationToken,
        answers: &[Answer],
    ) -> Result<u64, StoreError> {
        let mut columns = vec!["crd_number", "fund_id"];
        columns.extend(ANSWER_COLUMNS.iter().skip(1).copied());
        let config = UpsertConfig::new(
            "adv_fund_answers",
            &columns,
            &["crd_number", "fund_id", "question_key"],
        );

        let rows: Vec<Vec<Field>> = answers
            .iter()
            .filter_map(|a| match &a.fund_id {
                Some(fund_id) => Some(fund_answer_row(a, fund_id)),
                None => {
                    tracing::warn!(key = %a.question_key, "fund answer without fund id dropped");
                    None
                },
            })
            .collect();
        guard(cancel, bulk_upsert(&self.pool, &config, &rows)).await
    }

    async fn write_computed_metrics(
        &self,
        cancel: &CancellationToken,
        metrics: &ComputedMetrics,
    ) -> Result<(), StoreError> {
        let config = UpsertConfig::new(
            "adv_computed_metrics",
            &[
                "crd_number",
                "estimated_revenue",
                "blended_fee_bps",
                "revenue_per_client",
                "hybrid_revenue",
                "average_account_size",
                "aum_cagr_1y",
                "aum_cagr_3y",
                "aum_cagr_5y",
                "aum_cagr_all",
                "client_cagr_3y",
                "employee_cagr_3y",
                "client_growth_yoy",
                "employee_growth_yoy",
                "compensation_diversity",
                "business_complexity",
                "drp_severity",
                "concentration_risk",
                "key_person_dependency",
                "regulatory_risk",
                "acquisition_readiness",
                "estimated_expenses",
                "expense_ratio",
                "operating_margin",
                "revenue_per_employee",
                "aum_per_advisor",
                "amendment_frequency",
                "enforcement_count",
                "disclosure_count",
                "avg_answer_confidence",
                "answered_questions",
                "computed_at",
            ],
            &["crd_number"],
        );
        let row = vec![
            Field::Int(metrics.crd_number),
            opt_int(metrics.estimated_revenue),
            opt_int(metrics.blended_fee_bps),
            opt_int(metrics.revenue_per_client),
            opt_int(metrics.hybrid_revenue),
            opt_int(metrics.average_account_size),
            opt_float(metrics.aum_cagr_1y),
            opt_float(metrics.aum_cagr_3y),
            opt_float(metrics.aum_cagr_5y),
            opt_float(metrics.aum_cagr_all),
            opt_float(metrics.client_cagr_3y),
            opt_float(metrics.employee_cagr_3y),
            opt_float(metrics.client_growth_yoy),
            opt_float(metrics.employee_growth_yoy),
            opt_i32(metrics.compensation_diversity),
            opt_i32(metrics.business_complexity),
            opt_float(metrics.drp_severity),
            opt_float(metrics.concentration_risk),
            opt_float(metrics.key_person_dependency),
            opt_float(metrics.regulatory_risk),
            opt_float(metrics.acquisition_readiness),
            opt_int(metrics.estimated_expenses),
            opt_float(metrics.expense_ratio),
            opt_float(metrics.operating_margin),
            opt_int(metrics.revenue_per_employee),
            opt_int(metrics.aum_per_advisor),
            opt_float(metrics.amendment_frequency),
            opt_i32(metrics.enforcement_count),
            opt_i32(metrics.disclosure_count),
            opt_float(metrics.avg_answer_confidence),
            opt_i32(metrics.answered_questions),
            Field::Timestamp(metrics.computed_at),
        ];
        guard(cancel, bulk_upsert(&self.pool, &config, &[row])).await?;
        Ok(())
    }

    async fn write_section_index(
        &self,
        cancel: &CancellationToken,
        rows: &[SectionIndexRow],
    ) -> Result<u64, StoreError> {
        let config = UpsertConfig::new(
            "adv_document_sections",
            &[
                "crd_number",
                "doc_type",
                "doc_id",
                "section_key",
                "title",
                "char_length",
                "token_estimate",
            ],
            &["crd_number", "doc_type", "doc_id", "section_key"],
        );
        let encoded: Vec<Vec<Field>> = rows
            .iter()
            .map(|r| {
                vec![
                    Field::Int(r.crd_number),
                    Field::Text(r.doc_type.clone()),
                    Field::Int(r.doc_id),
                    Field::Text(r.section_key.clone()),
                    Field::Text(r.title.clone()),
                    Field::Int(r.char_length),
                    Field::Int(r.token_estimate),
                ]
            })
            .collect();
        guard(cancel, bulk_upsert(&self.pool, &config, &encoded)).await
    }

    async fn write_relationships(
        &self,
        cancel: &CancellationToken,
        rows: &RelationshipRows,
    ) -> Result<u64, StoreError> {
        let batches = vec![
            relationship_batch("adv_custodian_relationships", &rows.custodians),
            relationship_batch("adv_bd_affiliations", &rows.bd_affiliations),
            relationship_batch("adv_service_providers", &rows.service_providers),
        ];
        guard(cancel, bulk_upsert_many(&self.pool, &batches)).await
    }

    async fn archive_existing_answers(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
        superseded_by: &str,
    ) -> Result<u64, StoreError> {
        let archive = async {
            let mut tx = self.pool.begin().await?;

            let advisor = sqlx::query(
                r#"INSERT INTO adv_answer_history
                   (crd_number, fund_id, question_key, value, confidence, tier, reasoning,
                    source_doc, source_section, model, run_id, superseded_by, archived_at)
                   SELECT crd_number, NULL, question_key, value, confidence, tier, reasoning,
                          source_doc, source_section, model, run_id, $2, NOW()
                   FROM adv_advisor_answers WHERE crd_number = $1"#,
            )
            .bind(crd_number)
            .bind(superseded_by)
            .execute(&mut *tx)
            .await?;

            let fund = sqlx::query(
                r#"INSERT INTO adv_answer_history
                   (crd_number, fund_id, question_key, value, confidence, tier, reasoning,
                    source_doc, source_section, model, run_id, superseded_by, archived_at)
                   SELECT crd_number, fund_id, question_key, value, confidence, tier, reasoning,
                          source_doc, source_section, model, run_id, $2, NOW()
                   FROM adv_fund_answers WHERE crd_number = $1"#,
            )
            .bind(crd_number)
            .bind(superseded_by)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<u64, sqlx::Error>(advisor.rows_affected() + fund.rows_affected())
        };
        guard(cancel, archive).await
    }

    async fn refresh_materialized_view(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError> {
        guard(
            cancel,
            sqlx::query("REFRESH MATERIALIZED VIEW CONCURRENTLY adv_advisor_summary")
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
