//! Fee schedule parsing and revenue computation.

use serde::{Deserialize, Serialize};

use crate::models::AnswerValue;

/// One marginal fee tier. `max_aum == 0` means unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    pub min_aum: i64,
    pub max_aum: i64,
    pub annual_rate_pct: f64,
}

/// Parse a fee-schedule answer value: a list of maps carrying `min_aum`,
/// `max_aum`, and `annual_rate_pct`. Entries without a rate are dropped;
/// missing bounds default to 0.
pub fn parse_fee_tiers(value: &AnswerValue) -> Vec<FeeTier> {
    let AnswerValue::List(entries) = value else { return vec![] };
    entries
        .iter()
        .filter_map(|entry| {
            let AnswerValue::Map(map) = entry else { return None };
            let annual_rate_pct = map.get("annual_rate_pct")?.as_f64()?;
            Some(FeeTier {
                min_aum: map.get("min_aum").and_then(|v| v.as_i64()).unwrap_or(0),
                max_aum: map.get("max_aum").and_then(|v| v.as_i64()).unwrap_or(0),
                annual_rate_pct,
            })
        })
        .collect()
}

/// Annual advisory revenue in whole dollars for `aum` under a marginal tier
/// schedule. Input tier order does not matter; tiers are walked ascending by
/// `min_aum` with a cursor so overlapping bounds never double-bill.
pub fn compute_revenue(tiers: &[FeeTier], aum: i64) -> i64 {
    if tiers.is_empty() || aum <= 0 {
        return 0;
    }

    let mut sorted = tiers.to_vec();
    sorted.sort_by_key(|t| t.min_aum);

    let mut revenue = 0.0;
    let mut cursor: i64 = 0;
    for tier in &sorted {
        let lower = tier.min_aum.max(cursor);
        let upper = if tier.max_aum <= 0 { aum } else { tier.max_aum.min(aum) };
        if upper > lower {
            revenue += (upper - lower) as f64 * tier.annual_rate_pct / 100.0;
            cursor = upper;
        }
    }
    revenue.round() as i64
}

/// Blended realized rate in basis points: round(revenue / aum * 10_000).
pub fn blended_rate_bps(revenue: i64, aum: i64) -> Option<i64> {
    if aum <= 0 {
        return None;
    }
    Some((revenue as f64 / aum as f64 * 10_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_tier() -> Vec<FeeTier> {
        vec![
            FeeTier { min_aum: 0, max_aum: 250_000_000, annual_rate_pct: 1.00 },
            FeeTier { min_aum: 250_000_000, max_aum: 500_000_000, annual_rate_pct: 0.75 },
            FeeTier { min_aum: 500_000_000, max_aum: 0, annual_rate_pct: 0.50 },
        ]
    }

    #[test]
    fn test_three_tier_schedule() {
        let revenue = compute_revenue(&three_tier(), 500_000_000);
        assert_eq!(revenue, 4_375_000);
        assert_eq!(blended_rate_bps(revenue, 500_000_000), Some(88));
    }

    #[test]
    fn test_revenue_invariant_under_permutation() {
        let mut shuffled = three_tier();
        shuffled.swap(0, 2);
        assert_eq!(compute_revenue(&shuffled, 500_000_000), 4_375_000);
        shuffled.swap(0, 1);
        assert_eq!(compute_revenue(&shuffled, 500_000_000), 4_375_000);
    }

    #[test]
    fn test_revenue_nonnegative_and_zero_cases() {
        assert_eq!(compute_revenue(&three_tier(), 0), 0);
        assert_eq!(compute_revenue(&[], 1_000_000), 0);
        assert!(compute_revenue(&three_tier(), 1) >= 0);
    }

    #[test]
    fn test_unbounded_top_tier_marginal_bound() {
        // Doubling AUM adds at most top_rate * aum of extra revenue.
        let tiers = three_tier();
        let aum = 600_000_000;
        let r1 = compute_revenue(&tiers, aum);
        let r2 = compute_revenue(&tiers, 2 * aum);
        assert!(r2 >= r1);
        assert!((r2 - r1) as f64 <= 0.50 / 100.0 * aum as f64 + 1.0);
    }

    #[test]
    fn test_parse_round_trip() {
        let tiers = three_tier();
        let encoded = serde_json::to_value(&tiers).expect("serialize");
        let parsed = parse_fee_tiers(&AnswerValue::from_json(encoded));
        assert_eq!(parsed, tiers);
    }

    #[test]
    fn test_parse_tolerates_float_bounds_and_drops_rateless() {
        let value = AnswerValue::from_json(serde_json::json!([
            {"min_aum": 0.0, "max_aum": 1000000.5, "annual_rate_pct": 1.25},
            {"min_aum": 1000000, "max_aum": 0},
            "not a tier"
        ]));
        let tiers = parse_fee_tiers(&value);
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].max_aum, 1_000_000);
        assert_eq!(tiers[0].annual_rate_pct, 1.25);
    }

    #[test]
    fn test_non_list_value_parses_empty() {
        assert!(parse_fee_tiers(&AnswerValue::Null).is_empty());
        assert!(parse_fee_tiers(&AnswerValue::Text("1%".into())).is_empty());
    }
}
