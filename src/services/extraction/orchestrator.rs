//! Per-advisor tiered extraction pipeline.
//!
//! Phase order is fixed: structured bypass, then tiers 1-3 with
//! confidence-driven escalation, then fund fan-out, then a single write step
//! that always runs. Budget exhaustion never errors; it short-circuits the
//! remaining phases straight to the write.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::models::{AdvisorDocs, Answer, ExtractionRun, RunStatus, Scope};
use crate::questions::{self, Question};
use crate::services::bypass;
use crate::services::documents::{self, SectionIndexRow};
use crate::services::llm::{self, LlmClient, LlmError, TierConfig, Usage, prompts};
use crate::services::metrics;
use crate::store::{Store, StoreError};

use super::cost::CostTracker;
use super::merge::merge_answers;
use super::relationships::relationships_from_answers;

/// Concurrent funds per advisor.
const FUND_CONCURRENCY: usize = 5;
/// A tier-1 answer below this confidence is re-asked at tier 2.
const ESCALATION_CONFIDENCE: f64 = 0.4;

// ============================================================================
// Options and results
// ============================================================================

#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Highest tier to run (1-3).
    pub max_tier: u8,
    /// Archive existing answers before writing the new ones.
    pub force: bool,
    /// Skip advisor-scope phases; run fund extraction only.
    pub funds_only: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self { max_tier: 3, force: false, funds_only: false }
    }
}

/// Which model serves each tier.
#[derive(Debug, Clone)]
pub struct TierModels {
    pub tier1: String,
    pub tier2: String,
    pub tier3: String,
}

impl Default for TierModels {
    fn default() -> Self {
        Self {
            tier1: "claude-3-5-haiku-latest".to_string(),
            tier2: "claude-sonnet-4-5".to_string(),
            tier3: "claude-opus-4-1".to_string(),
        }
    }
}

impl TierModels {
    pub fn model_for(&self, tier: u8) -> &str {
        match tier {
            1 => &self.tier1,
            2 => &self.tier2,
            _ => &self.tier3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub crd_number: i64,
    pub total_questions: i64,
    pub answered: i64,
    pub tier_completed: u8,
    pub cost_usd: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("advisor {0} not found")]
    AdvisorNotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    store: Arc<dyn Store>,
    client: Arc<dyn LlmClient>,
    cost: Arc<CostTracker>,
    models: TierModels,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        client: Arc<dyn LlmClient>,
        cost: Arc<CostTracker>,
        models: TierModels,
    ) -> Self {
        Self { store, client, cost, models }
    }

    /// Run the full pipeline for one advisor. The run row is created up
    /// front; any failure before the write step marks it failed and persists
    /// no partial answers.
    pub async fn extract_advisor(
        &self,
        cancel: &CancellationToken,
        crd_number: i64,
        opts: &ExtractionOptions,
    ) -> Result<RunSummary, ExtractError> {
        let advisor = self
            .store
            .load_advisor(cancel, crd_number)
            .await?
            .ok_or(ExtractError::AdvisorNotFound(crd_number))?;
        let brochures = self.store.load_brochures(cancel, crd_number).await?;
        let crs = self.store.load_crs(cancel, crd_number).await?;
        let owners = self.store.load_owners(cancel, crd_number).await?;
        let funds = self.store.load_funds(cancel, crd_number).await?;

        let (docs, section_index) = documents::assemble(advisor, &brochures, &crs, &owners, funds);

        let scope = if opts.funds_only { Scope::Fund } else { Scope::Advisor };
        let mut run = ExtractionRun::start(crd_number, scope, None);
        self.store.create_run(cancel, &run).await?;
        tracing::info!(crd = crd_number, run_id = %run.id, "extraction run started");

        match self.run_pipeline(cancel, &docs, &section_index, &mut run, opts).await {
            Ok(summary) => {
                tracing::info!(
                    crd = crd_number,
                    run_id = %summary.run_id,
                    answered = summary.answered,
                    cost_usd = summary.cost_usd,
                    "extraction run complete"
                );
                Ok(summary)
            },
            Err(e) => {
                if let Err(fail_err) =
                    self.store.fail_run(cancel, &run.id, &e.to_string()).await
                {
                    tracing::error!(crd = crd_number, "could not mark run failed: {}", fail_err);
                }
                Err(e)
            },
        }
    }

    async fn run_pipeline(
        &self,
        cancel: &CancellationToken,
        docs: &AdvisorDocs,
        section_index: &[SectionIndexRow],
        run: &mut ExtractionRun,
        opts: &ExtractionOptions,
    ) -> Result<RunSummary, ExtractError> {
        let crd = docs.crd_number;
        let max_tier = opts.max_tier.clamp(1, 3);

        let mut answers: Vec<Answer> = Vec::new();
        let mut total_questions: i64 = 0;
        let mut tier_completed: u8 = 0;
        let mut budget_hit = false;

        if !opts.funds_only {
            // Phase 0: structured bypass, no model calls.
            let bypass_questions: Vec<&'static Question> = questions::structured_bypass_questions()
                .into_iter()
                .filter(|q| q.scope == Scope::Advisor)
                .collect();
            let bypass_keys: HashSet<&str> = bypass_questions.iter().map(|q| q.key).collect();
            let phase0: Vec<Answer> = bypass_questions
                .iter()
                .map(|q| tag_answer(bypass::bypass_answer(q, docs), crd, &run.id, None))
                .collect();
            total_questions += phase0.len() as i64;
            merge_answers(&mut answers, phase0);
            tracing::debug!(crd, bypassed = bypass_keys.len(), "structured bypass complete");

            let candidates: Vec<&'static Question> = questions::questions_by_scope(Scope::Advisor)
                .into_iter()
                .filter(|q| !q.structured_bypass && !bypass_keys.contains(q.key))
                .collect();

            for tier in 1..=max_tier {
                let tier_questions = select_tier_questions(&candidates, &answers, tier);
                if tier_questions.is_empty() {
                    tier_completed = tier;
                    continue;
                }
                total_questions += tier_questions
                    .iter()
                    .filter(|q| q.tier == tier)
                    .count() as i64;

                let config = TierConfig::new(tier, self.models.model_for(tier));
                let prompt = prompts::system_prompt(tier, &docs.firm_name, crd);
                let items = llm::build_items(&tier_questions, docs, &prompt, &config);
                tracing::info!(crd, tier, items = items.len(), "dispatching tier");

                match llm::dispatch_tier(Arc::clone(&self.client), cancel, items, &config).await {
                    Ok(outcome) => {
                        self.cost.record_usage(crd, tier, &outcome.usage);
                        run.input_tokens += outcome.usage.input_tokens;
                        run.output_tokens += outcome.usage.output_tokens;
                        let tagged: Vec<Answer> = outcome
                            .answers
                            .into_iter()
                            .map(|a| tag_answer(a, crd, &run.id, None))
                            .collect();
                        merge_answers(&mut answers, tagged);
                        tier_completed = tier;
                    },
                    Err(LlmError::Cancelled) => return Err(LlmError::Cancelled.into()),
                    Err(e) => {
                        tracing::warn!(crd, tier, "tier dispatch failed, continuing: {}", e);
                    },
                }

                if self.cost.check_budget(crd) {
                    tracing::warn!(crd, "per-advisor budget exhausted, skipping to write");
                    budget_hit = true;
                    break;
                }
            }
        }

        // Fund fan-out.
        let mut fund_answers: Vec<Answer> = Vec::new();
        if !docs.funds.is_empty() && !budget_hit {
            let (collected, fund_usage, fund_total) =
                self.extract_funds(cancel, docs, &run.id, max_tier).await?;
            run.input_tokens += fund_usage.input_tokens;
            run.output_tokens += fund_usage.output_tokens;
            total_questions += fund_total;
            fund_answers = collected;
            if opts.funds_only {
                tier_completed = max_tier;
            }
        }

        // Write step: always reached unless the pipeline errored above.
        self.store.write_section_index(cancel, section_index).await?;
        if opts.force {
            let archived = self.store.archive_existing_answers(cancel, crd, &run.id).await?;
            tracing::info!(crd, archived, "archived existing answers before re-extract");
        }
        self.store.write_advisor_answers(cancel, &answers).await?;
        self.store.write_fund_answers(cancel, &fund_answers).await?;

        if !opts.funds_only {
            let history = self.store.load_filing_history(cancel, crd).await?;
            let computed = metrics::compute(crd, &answers, &docs.advisor, &history);
            self.store.write_computed_metrics(cancel, &computed).await?;

            let rels = relationships_from_answers(crd, &answers);
            if !rels.is_empty() {
                self.store.write_relationships(cancel, &rels).await?;
            }
        }

        let advisor_cost = self.cost.advisor_cost(crd);
        run.status = RunStatus::Complete;
        run.completed_at = Some(chrono::Utc::now());
        run.tier_completed = tier_completed;
        run.total_questions = total_questions;
        run.answered = (answers.len() + fund_answers.len()) as i64;
        run.cost_usd = advisor_cost.cost_usd;
        self.store.complete_run(cancel, run).await?;

        Ok(RunSummary {
            run_id: run.id.clone(),
            crd_number: crd,
            total_questions,
            answered: run.answered,
            tier_completed,
            cost_usd: run.cost_usd,
        })
    }

    /// Fund-scope extraction: the tier loop per fund, at most
    /// `FUND_CONCURRENCY` funds in flight. Answers accumulate into one shared
    /// list; per-tier failures are logged and skipped, cancellation aborts.
    async fn extract_funds(
        &self,
        cancel: &CancellationToken,
        docs: &AdvisorDocs,
        run_id: &str,
        max_tier: u8,
    ) -> Result<(Vec<Answer>, Usage, i64), ExtractError> {
        let fund_questions = questions::questions_by_scope(Scope::Fund);
        let bypass_questions: Vec<&'static Question> =
            fund_questions.iter().copied().filter(|q| q.structured_bypass).collect();
        let candidates: Vec<&'static Question> =
            fund_questions.iter().copied().filter(|q| !q.structured_bypass).collect();

        let total_questions = (fund_questions.len() * docs.funds.len()) as i64;
        let docs = Arc::new(docs.clone());
        let collected: Arc<Mutex<Vec<Answer>>> = Arc::new(Mutex::new(Vec::new()));
        let usage_total: Arc<Mutex<Usage>> = Arc::new(Mutex::new(Usage::default()));
        let semaphore = Arc::new(Semaphore::new(FUND_CONCURRENCY));
        let mut join_set = JoinSet::new();

        for fund in docs.funds.clone() {
            let docs = Arc::clone(&docs);
            let collected = Arc::clone(&collected);
            let usage_total = Arc::clone(&usage_total);
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let cost = Arc::clone(&self.cost);
            let models = self.models.clone();
            let cancel = cancel.clone();
            let run_id = run_id.to_string();
            let bypass_questions = bypass_questions.clone();
            let candidates = candidates.clone();

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else { return };
                let crd = docs.crd_number;
                let fund_id = fund.fund_id.clone();

                let mut answers: Vec<Answer> = bypass_questions
                    .iter()
                    .map(|q| {
                        tag_answer(bypass::bypass_fund_answer(q, &fund), crd, &run_id, Some(&fund_id))
                    })
                    .collect();

                for tier in 1..=max_tier {
                    if cancel.is_cancelled() || cost.check_budget(crd) {
                        break;
                    }
                    let tier_questions = select_tier_questions(&candidates, &answers, tier);
                    if tier_questions.is_empty() {
                        continue;
                    }

                    let config = TierConfig::new(tier, models.model_for(tier));
                    let context = documents::fund_context(&docs, &fund);
                    let prompt =
                        prompts::fund_system_prompt(tier, &docs.firm_name, crd, &context);
                    let items = llm::build_items(&tier_questions, &docs, &prompt, &config);

                    match llm::dispatch_tier(Arc::clone(&client), &cancel, items, &config).await {
                        Ok(outcome) => {
                            cost.record_usage(crd, tier, &outcome.usage);
                            usage_total
                                .lock()
                                .expect("fund usage poisoned")
                                .add(&outcome.usage);
                            let tagged: Vec<Answer> = outcome
                                .answers
                                .into_iter()
                                .map(|a| tag_answer(a, crd, &run_id, Some(&fund_id)))
                                .collect();
                            merge_answers(&mut answers, tagged);
                        },
                        Err(LlmError::Cancelled) => break,
                        Err(e) => {
                            tracing::warn!(
                                crd,
                                fund_id = %fund_id,
                                tier,
                                "fund tier dispatch failed, continuing: {}",
                                e
                            );
                        },
                    }
                }

                collected.lock().expect("fund answers poisoned").extend(answers);
            });
        }

        while join_set.join_next().await.is_some() {}

        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled.into());
        }

        let answers = Arc::try_unwrap(collected)
            .map(|m| m.into_inner().expect("fund answers poisoned"))
            .unwrap_or_default();
        let usage = usage_total.lock().expect("fund usage poisoned").clone();
        Ok((answers, usage, total_questions))
    }
}

fn tag_answer(mut answer: Answer, crd: i64, run_id: &str, fund_id: Option<&str>) -> Answer {
    answer.crd_number = crd;
    answer.run_id = run_id.to_string();
    if answer.fund_id.is_none() {
        answer.fund_id = fund_id.map(|f| f.to_string());
    }
    answer
}

/// Questions to dispatch at a tier: the tier's own questions, plus (at tier
/// 2) escalated copies of tier-1 questions whose answers came back
/// low-confidence but non-null.
fn select_tier_questions(
    candidates: &[&'static Question],
    answers: &[Answer],
    tier: u8,
) -> Vec<&'static Question> {
    let mut selected: Vec<&'static Question> =
        candidates.iter().copied().filter(|q| q.tier == tier).collect();

    if tier == 2 {
        let escalations: Vec<&'static Question> = answers
            .iter()
            .filter(|a| {
                a.tier == 1 && a.confidence < ESCALATION_CONFIDENCE && !a.value.is_null()
            })
            .filter_map(|a| {
                candidates
                    .iter()
                    .copied()
                    .find(|q| q.key == a.question_key && q.tier == 1)
            })
            .collect();
        if !escalations.is_empty() {
            tracing::debug!(count = escalations.len(), "escalating low-confidence answers");
            selected.extend(escalations);
        }
    }

    selected
}
