//! Derived-metrics computer: turns the canonical answer set, the Part 1 row,
//! and the filing history into the `ComputedMetrics` row.

pub mod fees;
pub mod growth;
pub mod scores;

use crate::models::{AdvisorRecord, Answer, AnswerValue, ComputedMetrics, FilingSnapshot};

pub use fees::{FeeTier, blended_rate_bps, compute_revenue, parse_fee_tiers};
pub use growth::{GrowthMetrics, compute_growth};
pub use scores::{
    Profitability, ReadinessInputs, acquisition_readiness, business_complexity,
    compensation_diversity, concentration_risk, disclosure_count, drp_severity,
    enforcement_count, key_person_dependency, profitability, regulatory_risk,
};

/// Estimated flat revenue per client for each non-AUM fee arrangement, used
/// by the hybrid revenue estimate.
const NON_AUM_REVENUE_PER_CLIENT: i64 = 1_000;

/// Compute the full metrics row for one advisor.
pub fn compute(
    crd_number: i64,
    answers: &[Answer],
    advisor: &AdvisorRecord,
    history: &[FilingSnapshot],
) -> ComputedMetrics {
    let mut metrics = ComputedMetrics::new(crd_number);

    // Revenue off the extracted fee schedule.
    let tiers = answer_value(answers, "fee_schedule")
        .map(parse_fee_tiers)
        .unwrap_or_default();
    let fee_schedule_parsed = !tiers.is_empty();
    if let Some(aum) = advisor.total_aum.filter(|a| *a > 0) {
        if fee_schedule_parsed {
            let revenue = compute_revenue(&tiers, aum);
            metrics.estimated_revenue = Some(revenue);
            metrics.blended_fee_bps = blended_rate_bps(revenue, aum);
            if let Some(clients) = advisor.total_clients.filter(|c| *c > 0) {
                metrics.revenue_per_client = Some(revenue / clients);
            }
            metrics.hybrid_revenue = Some(hybrid_revenue(advisor, revenue));

            if let Some(p) = profitability(advisor, revenue) {
                metrics.estimated_expenses = Some(p.estimated_expenses);
                metrics.expense_ratio = Some(p.expense_ratio);
                metrics.operating_margin = Some(p.operating_margin);
                metrics.revenue_per_employee = Some(p.revenue_per_employee);
            }
        }
        if let Some(accounts) = advisor.total_accounts.filter(|c| *c > 0) {
            metrics.average_account_size = Some(aum / accounts);
        }
        if let Some(advisory) = advisor.advisory_employees.filter(|n| *n > 0) {
            metrics.aum_per_advisor = Some(aum / advisory);
        }
    }

    // Growth over the filing history.
    let growth = compute_growth(history);
    metrics.aum_cagr_1y = growth.aum_cagr_1y;
    metrics.aum_cagr_3y = growth.aum_cagr_3y;
    metrics.aum_cagr_5y = growth.aum_cagr_5y;
    metrics.aum_cagr_all = growth.aum_cagr_all;
    metrics.client_cagr_3y = growth.client_cagr_3y;
    metrics.employee_cagr_3y = growth.employee_cagr_3y;
    metrics.client_growth_yoy = growth.client_growth_yoy;
    metrics.employee_growth_yoy = growth.employee_growth_yoy;
    metrics.amendment_frequency = growth.amendment_frequency;

    // Flag-derived scores.
    let diversity = compensation_diversity(advisor);
    let complexity = business_complexity(advisor);
    let severity = drp_severity(advisor);
    let enforcement = enforcement_count(advisor);
    let disclosures = disclosure_count(advisor);
    metrics.compensation_diversity = Some(diversity);
    metrics.business_complexity = Some(complexity);
    metrics.drp_severity = Some(severity);
    metrics.enforcement_count = Some(enforcement);
    metrics.disclosure_count = Some(disclosures);

    // Answer-derived scores.
    metrics.concentration_risk = concentration_risk(
        answer_f64(answers, "client_concentration_hhi"),
        answer_f64(answers, "top_client_aum_pct"),
        answer_f64(answers, "client_retention_rate"),
    );

    let succession = answer_truthy(answers, "succession_plan");
    metrics.key_person_dependency = Some(key_person_dependency(
        owner_count(answers),
        succession,
        answer_truthy(answers, "non_compete_agreements"),
        answer_f64(answers, "key_person_aum_share"),
        answer_truthy(answers, "equity_incentives"),
    ));

    metrics.regulatory_risk = Some(regulatory_risk(
        severity,
        enforcement,
        disclosures,
        growth.amendment_frequency,
    ));

    // Extraction quality.
    let answered: Vec<&Answer> = answers.iter().filter(|a| !a.value.is_null()).collect();
    metrics.answered_questions = Some(answered.len() as i32);
    let mean_confidence = if answered.is_empty() {
        None
    } else {
        Some(answered.iter().map(|a| a.confidence).sum::<f64>() / answered.len() as f64)
    };
    metrics.avg_answer_confidence = mean_confidence;

    metrics.acquisition_readiness = Some(acquisition_readiness(&ReadinessInputs {
        fee_schedule_parsed,
        aum_growth: growth.aum_cagr_1y.or(growth.aum_cagr_all),
        client_growth: growth.client_growth_yoy,
        drp_severity: severity,
        succession_plan: succession,
        code_of_ethics: answer_truthy(answers, "code_of_ethics"),
        business_complexity: complexity,
        compensation_diversity: diversity,
        mean_confidence,
        amendments_per_year: growth.amendment_frequency,
    }));

    metrics
}

/// Fee revenue plus estimated non-AUM revenue: a 10% uplift when performance
/// fees are charged, and a flat per-client amount for each of the
/// fixed/hourly/subscription arrangements.
fn hybrid_revenue(advisor: &AdvisorRecord, fee_revenue: i64) -> i64 {
    let mut revenue = fee_revenue;
    if flag(advisor.comp_performance.as_deref()) {
        revenue += fee_revenue / 10;
    }
    let clients = advisor.total_clients.unwrap_or(0);
    for arrangement in [
        advisor.comp_fixed.as_deref(),
        advisor.comp_hourly.as_deref(),
        advisor.comp_subscription.as_deref(),
    ] {
        if flag(arrangement) {
            revenue += clients * NON_AUM_REVENUE_PER_CLIENT;
        }
    }
    revenue
}

fn flag(value: Option<&str>) -> bool {
    value
        .map(|v| AnswerValue::Text(v.to_string()).is_truthy())
        .unwrap_or(false)
}

fn answer_value<'a>(answers: &'a [Answer], key: &str) -> Option<&'a AnswerValue> {
    answers
        .iter()
        .find(|a| a.question_key == key && !a.value.is_null())
        .map(|a| &a.value)
}

fn answer_f64(answers: &[Answer], key: &str) -> Option<f64> {
    answer_value(answers, key).and_then(|v| v.as_f64())
}

fn answer_truthy(answers: &[Answer], key: &str) -> bool {
    answer_value(answers, key).map(|v| v.is_truthy()).unwrap_or(false)
}

/// Owner count from the `ownership_structure` answer's `owner_count` field.
fn owner_count(answers: &[Answer]) -> Option<i64> {
    match answer_value(answers, "ownership_structure")? {
        AnswerValue::Map(map) => map.get("owner_count").and_then(|v| v.as_i64()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(key: &str, value: serde_json::Value, confidence: f64) -> Answer {
        Answer { confidence, tier: 1, ..Answer::new(key, AnswerValue::from_json(value)) }
    }

    fn advisor_fixture() -> AdvisorRecord {
        AdvisorRecord {
            crd_number: 1,
            firm_name: "Test Advisors".into(),
            total_aum: Some(500_000_000),
            total_accounts: Some(250),
            total_clients: Some(200),
            total_employees: Some(10),
            advisory_employees: Some(4),
            comp_pct_of_aum: Some("Y".into()),
            comp_performance: Some("Y".into()),
            comp_fixed: Some("Y".into()),
            ..Default::default()
        }
    }

    fn fee_schedule_answer() -> Answer {
        answer(
            "fee_schedule",
            serde_json::json!([
                {"min_aum": 0, "max_aum": 250_000_000, "annual_rate_pct": 1.00},
                {"min_aum": 250_000_000, "max_aum": 500_000_000, "annual_rate_pct": 0.75},
                {"min_aum": 500_000_000, "max_aum": 0, "annual_rate_pct": 0.50}
            ]),
            0.9,
        )
    }

    #[test]
    fn test_revenue_metrics_from_fee_schedule() {
        let answers = vec![fee_schedule_answer()];
        let metrics = compute(1, &answers, &advisor_fixture(), &[]);
        assert_eq!(metrics.estimated_revenue, Some(4_375_000));
        assert_eq!(metrics.blended_fee_bps, Some(88));
        assert_eq!(metrics.revenue_per_client, Some(21_875));
        assert_eq!(metrics.average_account_size, Some(2_000_000));
        assert_eq!(metrics.aum_per_advisor, Some(125_000_000));
        // Performance uplift (437,500) plus fixed fees (200 x 1,000).
        assert_eq!(metrics.hybrid_revenue, Some(4_375_000 + 437_500 + 200_000));
        // Expenses: 6 support x 150k + 4 advisory x 250k.
        assert_eq!(metrics.estimated_expenses, Some(1_900_000));
    }

    #[test]
    fn test_no_fee_schedule_leaves_revenue_null() {
        let metrics = compute(1, &[], &advisor_fixture(), &[]);
        assert!(metrics.estimated_revenue.is_none());
        assert!(metrics.blended_fee_bps.is_none());
        // Structural metrics still compute.
        assert_eq!(metrics.average_account_size, Some(2_000_000));
        assert_eq!(metrics.compensation_diversity, Some(3));
    }

    #[test]
    fn test_key_person_and_concentration_from_answers() {
        let answers = vec![
            answer(
                "ownership_structure",
                serde_json::json!({"owner_count": 1, "single_owner": true}),
                0.8,
            ),
            answer("succession_plan", serde_json::json!(false), 0.7),
            answer("key_person_aum_share", serde_json::json!(60.0), 0.6),
            answer("client_concentration_hhi", serde_json::json!(0.5), 0.6),
            answer("top_client_aum_pct", serde_json::json!(20.0), 0.6),
            answer("client_retention_rate", serde_json::json!(95.0), 0.6),
        ];
        let metrics = compute(1, &answers, &advisor_fixture(), &[]);
        // 3 (single owner) + 2 (no succession) + 1 (no non-compete) + 2
        // (share > 50%) + 1 (no equity incentives).
        assert_eq!(metrics.key_person_dependency, Some(9.0));

        let concentration = metrics.concentration_risk.unwrap();
        // 0.4*5.0 + 0.3*2.0 + 0.3*0.5
        assert!((concentration - 2.75).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_and_answered_counts_exclude_nulls() {
        let answers = vec![
            answer("a", serde_json::json!(1), 0.8),
            answer("b", serde_json::json!(null), 0.0),
            answer("c", serde_json::json!("x"), 0.6),
        ];
        let metrics = compute(1, &answers, &advisor_fixture(), &[]);
        assert_eq!(metrics.answered_questions, Some(2));
        assert!((metrics.avg_answer_confidence.unwrap() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_readiness_uses_fee_schedule_and_flags() {
        let with_schedule = compute(1, &[fee_schedule_answer()], &advisor_fixture(), &[]);
        let without = compute(1, &[], &advisor_fixture(), &[]);
        let delta = with_schedule.acquisition_readiness.unwrap()
            - without.acquisition_readiness.unwrap();
        // +15 for the parsed schedule, +5 for mean confidence above 0.7.
        assert_eq!(delta, 20.0);
    }
}
