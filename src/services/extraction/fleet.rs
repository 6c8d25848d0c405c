//! Fleet runner: bounded fan-out of the per-advisor pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::services::llm::Usage;
use crate::store::Store;

use super::cost::{CostTracker, PricingTable};
use super::orchestrator::{ExtractionOptions, Orchestrator};

/// Concurrent advisors.
const FLEET_CONCURRENCY: usize = 5;

// A priori token assumptions for the dry-run estimate, per advisor.
const EST_T1_QUESTIONS: i64 = 160;
const EST_T1_INPUT: i64 = 500;
const EST_T1_CACHED_INPUT: i64 = 1_500;
const EST_T1_OUTPUT: i64 = 100;
const EST_T2_QUESTIONS: i64 = 8;
const EST_T2_INPUT: i64 = 5_000;
const EST_T2_OUTPUT: i64 = 400;
const EST_T3_QUESTIONS: i64 = 12;
const EST_T3_INPUT: i64 = 8_000;
const EST_T3_OUTPUT: i64 = 1_000;

#[derive(Debug, Clone)]
pub struct FleetSummary {
    pub completed: usize,
    pub failed: usize,
    pub total_cost_usd: f64,
    pub elapsed: Duration,
}

pub struct FleetRunner {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn Store>,
    cost: Arc<CostTracker>,
}

impl FleetRunner {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn Store>,
        cost: Arc<CostTracker>,
    ) -> Self {
        Self { orchestrator, store, cost }
    }

    /// Run the pipeline over every CRD, at most `FLEET_CONCURRENCY` at a
    /// time. One advisor failing never cancels its peers; failures are
    /// counted and logged. The materialized view refresh afterwards is
    /// best-effort.
    pub async fn run_batch(
        &self,
        cancel: &CancellationToken,
        crds: &[i64],
        opts: &ExtractionOptions,
    ) -> FleetSummary {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(FLEET_CONCURRENCY));
        let mut join_set: JoinSet<bool> = JoinSet::new();

        for &crd in crds {
            let semaphore = Arc::clone(&semaphore);
            let orchestrator = Arc::clone(&self.orchestrator);
            let cancel = cancel.clone();
            let opts = opts.clone();
            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else { return false };
                match orchestrator.extract_advisor(&cancel, crd, &opts).await {
                    Ok(summary) => {
                        tracing::info!(
                            crd,
                            answered = summary.answered,
                            cost_usd = summary.cost_usd,
                            "advisor complete"
                        );
                        true
                    },
                    Err(e) => {
                        tracing::error!(crd, "advisor extraction failed: {}", e);
                        false
                    },
                }
            });
        }

        let mut completed = 0usize;
        let mut failed = 0usize;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(true) => completed += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    tracing::error!("advisor task panicked: {}", e);
                    failed += 1;
                },
            }
        }

        if let Err(e) = self.store.refresh_materialized_view(cancel).await {
            tracing::warn!("materialized view refresh failed: {}", e);
        }

        let summary = FleetSummary {
            completed,
            failed,
            total_cost_usd: self.cost.total_cost(),
            elapsed: start.elapsed(),
        };
        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            total_cost_usd = summary.total_cost_usd,
            elapsed_secs = summary.elapsed.as_secs(),
            "fleet run finished"
        );
        summary
    }
}

/// A priori USD estimate for a fleet run, used by `--dry-run`.
pub fn estimate_batch_cost(pricing: &PricingTable, advisor_count: usize, max_tier: u8) -> f64 {
    let mut per_advisor = 0.0;

    if max_tier >= 1 {
        let usage = Usage {
            input_tokens: EST_T1_INPUT * EST_T1_QUESTIONS,
            output_tokens: EST_T1_OUTPUT * EST_T1_QUESTIONS,
            cache_read_input_tokens: EST_T1_CACHED_INPUT * EST_T1_QUESTIONS,
            cache_creation_input_tokens: 0,
        };
        per_advisor += pricing.calculate_cost(1, &usage);
    }
    if max_tier >= 2 {
        let usage = Usage {
            input_tokens: EST_T2_INPUT * EST_T2_QUESTIONS,
            output_tokens: EST_T2_OUTPUT * EST_T2_QUESTIONS,
            ..Default::default()
        };
        per_advisor += pricing.calculate_cost(2, &usage);
    }
    if max_tier >= 3 {
        let usage = Usage {
            input_tokens: EST_T3_INPUT * EST_T3_QUESTIONS,
            output_tokens: EST_T3_OUTPUT * EST_T3_QUESTIONS,
            ..Default::default()
        };
        per_advisor += pricing.calculate_cost(3, &usage);
    }

    per_advisor * advisor_count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_scales_linearly_with_advisors() {
        let pricing = PricingTable::default();
        let one = estimate_batch_cost(&pricing, 1, 3);
        let ten = estimate_batch_cost(&pricing, 10, 3);
        assert!(one > 0.0);
        assert!((ten - one * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_grows_with_max_tier() {
        let pricing = PricingTable::default();
        let t1 = estimate_batch_cost(&pricing, 1, 1);
        let t2 = estimate_batch_cost(&pricing, 1, 2);
        let t3 = estimate_batch_cost(&pricing, 1, 3);
        assert!(t1 < t2 && t2 < t3);
    }

    #[test]
    fn test_tier1_estimate_matches_rate_formula() {
        let pricing = PricingTable::default();
        let est = estimate_batch_cost(&pricing, 1, 1);
        // 160 questions x (500 in + 1500 cache-read + 100 out) at tier 1 rates.
        let expected = 160.0 * (500.0 * 0.80 + 1_500.0 * 0.08 + 100.0 * 4.00) / 1_000_000.0;
        assert!((est - expected).abs() < 1e-9);
    }
}
