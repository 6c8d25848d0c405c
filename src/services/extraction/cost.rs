//! Fleet-wide cost tracker with per-advisor budget enforcement.
//!
//! One tracker is shared by every concurrent advisor run. All counters sit
//! behind a single mutex; nothing holds the lock across an await point.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::services::llm::Usage;

/// USD per 1,000,000 tokens, by token class.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct TierRates {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

/// Per-tier rate vectors. Tier 0 (structured bypass) is free.
#[derive(Debug, Clone, Copy)]
pub struct PricingTable {
    pub tier1: TierRates,
    pub tier2: TierRates,
    pub tier3: TierRates,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            tier1: TierRates { input: 0.80, output: 4.00, cache_write: 1.00, cache_read: 0.08 },
            tier2: TierRates { input: 3.00, output: 15.00, cache_write: 3.75, cache_read: 0.30 },
            tier3: TierRates { input: 15.00, output: 75.00, cache_write: 18.75, cache_read: 1.50 },
        }
    }
}

impl PricingTable {
    fn rates(&self, tier: u8) -> Option<TierRates> {
        match tier {
            1 => Some(self.tier1),
            2 => Some(self.tier2),
            3 => Some(self.tier3),
            _ => None,
        }
    }

    /// Cost in USD for one usage record at the given tier.
    pub fn calculate_cost(&self, tier: u8, usage: &Usage) -> f64 {
        let Some(rates) = self.rates(tier) else { return 0.0 };
        const PER: f64 = 1_000_000.0;
        usage.input_tokens as f64 / PER * rates.input
            + usage.output_tokens as f64 / PER * rates.output
            + usage.cache_creation_input_tokens as f64 / PER * rates.cache_write
            + usage.cache_read_input_tokens as f64 / PER * rates.cache_read
    }
}

/// Running totals for one advisor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisorCost {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_write_tokens: i64,
    pub cache_read_tokens: i64,
    pub cost_usd: f64,
    pub budget_exceeded: bool,
}

pub struct CostTracker {
    pricing: PricingTable,
    /// Per-advisor USD budget. None or non-positive disables the gate.
    budget_usd: Option<f64>,
    state: Mutex<HashMap<i64, AdvisorCost>>,
}

impl CostTracker {
    pub fn new(pricing: PricingTable, budget_usd: Option<f64>) -> Self {
        Self { pricing, budget_usd, state: Mutex::new(HashMap::new()) }
    }

    pub fn record_usage(&self, crd_number: i64, tier: u8, usage: &Usage) {
        let cost = self.pricing.calculate_cost(tier, usage);
        let mut state = self.state.lock().expect("cost tracker poisoned");
        let entry = state.entry(crd_number).or_default();
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
        entry.cache_write_tokens += usage.cache_creation_input_tokens;
        entry.cache_read_tokens += usage.cache_read_input_tokens;
        entry.cost_usd += cost;
    }

    /// True iff a positive budget is configured and the advisor's spend has
    /// reached it. Latches the `budget_exceeded` flag while holding the lock.
    pub fn check_budget(&self, crd_number: i64) -> bool {
        let Some(budget) = self.budget_usd.filter(|b| *b > 0.0) else { return false };
        let mut state = self.state.lock().expect("cost tracker poisoned");
        let entry = state.entry(crd_number).or_default();
        if entry.cost_usd >= budget {
            entry.budget_exceeded = true;
        }
        entry.budget_exceeded
    }

    pub fn advisor_cost(&self, crd_number: i64) -> AdvisorCost {
        self.state
            .lock()
            .expect("cost tracker poisoned")
            .get(&crd_number)
            .copied()
            .unwrap_or_default()
    }

    /// Sum of per-advisor costs across the fleet.
    pub fn total_cost(&self) -> f64 {
        self.state
            .lock()
            .expect("cost tracker poisoned")
            .values()
            .map(|c| c.cost_usd)
            .sum()
    }
}
