//! Composite scoring over Part 1 flags and extracted answers.

use crate::models::{AdvisorRecord, AnswerValue};

/// Weighted severity per DRP flag. The cap keeps a long rap sheet from
/// dominating downstream scores.
const DRP_WEIGHTS: [(fn(&AdvisorRecord) -> &Option<String>, f64); 10] = [
    (|a| &a.drp_felony_conviction, 3.0),
    (|a| &a.drp_felony_charge, 2.0),
    (|a| &a.drp_misdemeanor_conviction, 1.0),
    (|a| &a.drp_sec_cftc_finding, 2.5),
    (|a| &a.drp_sec_cftc_order, 2.0),
    (|a| &a.drp_regulatory_finding, 1.5),
    (|a| &a.drp_regulatory_order, 1.5),
    (|a| &a.drp_civil_injunction, 2.0),
    (|a| &a.drp_civil_finding, 1.5),
    (|a| &a.drp_bar_or_suspension, 3.0),
];

const DRP_SEVERITY_CAP: f64 = 10.0;
const BUSINESS_COMPLEXITY_CAP: i32 = 30;

fn flag_truthy(value: &Option<String>) -> bool {
    value
        .as_ref()
        .map(|v| AnswerValue::Text(v.clone()).is_truthy())
        .unwrap_or(false)
}

/// Count of truthy compensation arrangements (max 7).
pub fn compensation_diversity(advisor: &AdvisorRecord) -> i32 {
    [
        &advisor.comp_pct_of_aum,
        &advisor.comp_hourly,
        &advisor.comp_subscription,
        &advisor.comp_fixed,
        &advisor.comp_commission,
        &advisor.comp_performance,
        &advisor.comp_other,
    ]
    .iter()
    .filter(|v| flag_truthy(v))
    .count() as i32
}

/// Count of truthy other-business and affiliation flags, capped at 30.
pub fn business_complexity(advisor: &AdvisorRecord) -> i32 {
    let count = [
        &advisor.biz_broker_dealer,
        &advisor.biz_registered_rep,
        &advisor.biz_cpo_cta,
        &advisor.biz_futures_merchant,
        &advisor.biz_real_estate,
        &advisor.biz_insurance,
        &advisor.biz_bank,
        &advisor.biz_trust_company,
        &advisor.biz_municipal_advisor,
        &advisor.biz_swap_dealer,
        &advisor.biz_accountant,
        &advisor.biz_lawyer,
        &advisor.biz_other,
        &advisor.aff_broker_dealer,
        &advisor.aff_investment_company,
        &advisor.aff_other_adviser,
        &advisor.aff_futures_merchant,
        &advisor.aff_bank,
        &advisor.aff_insurance,
        &advisor.aff_pension_consultant,
        &advisor.aff_real_estate,
        &advisor.aff_sponsor_lp,
        &advisor.aff_trust_company,
        &advisor.aff_accountant,
        &advisor.aff_lawyer,
    ]
    .iter()
    .filter(|v| flag_truthy(v))
    .count() as i32;
    count.min(BUSINESS_COMPLEXITY_CAP)
}

/// Weighted DRP severity, capped at 10.
pub fn drp_severity(advisor: &AdvisorRecord) -> f64 {
    let total: f64 = DRP_WEIGHTS
        .iter()
        .filter(|(field, _)| flag_truthy(field(advisor)))
        .map(|(_, weight)| weight)
        .sum();
    total.min(DRP_SEVERITY_CAP)
}

/// Count of truthy enforcement-class DRP flags (regulator findings, orders,
/// bars).
pub fn enforcement_count(advisor: &AdvisorRecord) -> i32 {
    [
        &advisor.drp_sec_cftc_finding,
        &advisor.drp_sec_cftc_order,
        &advisor.drp_regulatory_finding,
        &advisor.drp_regulatory_order,
        &advisor.drp_bar_or_suspension,
    ]
    .iter()
    .filter(|v| flag_truthy(v))
    .count() as i32
}

/// Count of all truthy DRP flags.
pub fn disclosure_count(advisor: &AdvisorRecord) -> i32 {
    DRP_WEIGHTS
        .iter()
        .filter(|(field, _)| flag_truthy(field(advisor)))
        .count() as i32
}

/// Client concentration risk on a 0-10 scale:
/// `0.4 * HHI + 0.3 * top-client share + 0.3 * (1 - retention)`, each
/// component normalized to [0, 10] first.
///
/// `hhi` is expected on a 0-1 scale, `top_client_pct` and `retention_pct` on
/// 0-100. A 0-1 retention answer must be normalized by the caller; this
/// function does not auto-detect the scale.
pub fn concentration_risk(
    hhi: Option<f64>,
    top_client_pct: Option<f64>,
    retention_pct: Option<f64>,
) -> Option<f64> {
    if hhi.is_none() && top_client_pct.is_none() && retention_pct.is_none() {
        return None;
    }
    let hhi_component = (hhi.unwrap_or(0.0).clamp(0.0, 1.0)) * 10.0;
    let top_component = top_client_pct.unwrap_or(0.0).clamp(0.0, 100.0) / 10.0;
    let retention_component = (1.0 - retention_pct.unwrap_or(100.0).clamp(0.0, 100.0) / 100.0) * 10.0;
    Some(0.4 * hhi_component + 0.3 * top_component + 0.3 * retention_component)
}

/// Key-person dependency on a 0-10 scale.
pub fn key_person_dependency(
    owner_count: Option<i64>,
    succession_plan: bool,
    non_compete: bool,
    key_person_aum_share_pct: Option<f64>,
    equity_incentives: bool,
) -> f64 {
    let mut score: f64 = 0.0;
    match owner_count {
        Some(1) => score += 3.0,
        Some(2) => score += 2.0,
        _ => {},
    }
    if !succession_plan {
        score += 2.0;
    }
    if !non_compete {
        score += 1.0;
    }
    if let Some(share) = key_person_aum_share_pct {
        if share > 50.0 {
            score += 2.0;
        } else if share > 25.0 {
            score += 1.0;
        }
    }
    if !equity_incentives {
        score += 1.0;
    }
    score.min(10.0)
}

/// Inputs to the acquisition readiness score.
#[derive(Debug, Clone, Default)]
pub struct ReadinessInputs {
    pub fee_schedule_parsed: bool,
    pub aum_growth: Option<f64>,
    pub client_growth: Option<f64>,
    pub drp_severity: f64,
    pub succession_plan: bool,
    pub code_of_ethics: bool,
    pub business_complexity: i32,
    pub compensation_diversity: i32,
    pub mean_confidence: Option<f64>,
    pub amendments_per_year: Option<f64>,
}

/// Acquisition readiness on a 0-100 scale, starting from a neutral 50.
pub fn acquisition_readiness(inputs: &ReadinessInputs) -> f64 {
    let mut score: f64 = 50.0;
    if inputs.fee_schedule_parsed {
        score += 15.0;
    }
    if inputs.aum_growth.unwrap_or(0.0) > 0.05 {
        score += 10.0;
    }
    if inputs.client_growth.unwrap_or(0.0) > 0.0 {
        score += 5.0;
    }
    if inputs.drp_severity > 3.0 {
        score -= 10.0;
    }
    if inputs.succession_plan {
        score += 10.0;
    }
    if inputs.code_of_ethics {
        score += 5.0;
    }
    if inputs.business_complexity > 15 {
        score -= 5.0;
    }
    if inputs.compensation_diversity >= 3 {
        score += 5.0;
    }
    if inputs.mean_confidence.unwrap_or(0.0) > 0.7 {
        score += 5.0;
    }
    if inputs.amendments_per_year.unwrap_or(0.0) > 3.0 {
        score -= 5.0;
    }
    score.clamp(0.0, 100.0)
}

/// Regulatory risk on a 0-100 scale.
pub fn regulatory_risk(
    drp_severity: f64,
    enforcement_count: i32,
    disclosure_count: i32,
    amendments_per_year: Option<f64>,
) -> f64 {
    let mut score = 4.0 * drp_severity;
    score += (10.0 * enforcement_count as f64).min(30.0);
    score += (5.0 * disclosure_count as f64).min(20.0);
    if let Some(amendments) = amendments_per_year {
        if amendments > 3.0 {
            score += (5.0 * (amendments - 3.0)).min(10.0);
        }
    }
    score.clamp(0.0, 100.0)
}

/// Headcount-based profitability estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct Profitability {
    pub estimated_expenses: i64,
    pub expense_ratio: f64,
    pub operating_margin: f64,
    pub revenue_per_employee: i64,
}

/// Expense model: support staff at $150k, advisory staff at $250k, falling
/// back to a blended $175k per head when the split is unknown.
pub fn profitability(advisor: &AdvisorRecord, revenue: i64) -> Option<Profitability> {
    let total = advisor.total_employees.filter(|n| *n > 0)?;
    if revenue <= 0 {
        return None;
    }

    let expenses = match advisor.advisory_employees {
        Some(advisory) if advisory <= total => {
            (total - advisory) * 150_000 + advisory * 250_000
        },
        _ => total * 175_000,
    };

    let expense_ratio = expenses as f64 / revenue as f64;
    Some(Profitability {
        estimated_expenses: expenses,
        expense_ratio,
        operating_margin: 1.0 - expense_ratio,
        revenue_per_employee: revenue / total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisor_with_flags() -> AdvisorRecord {
        AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            comp_pct_of_aum: Some("Y".into()),
            comp_fixed: Some("Y".into()),
            comp_hourly: Some("N".into()),
            comp_performance: Some("Y".into()),
            biz_insurance: Some("Y".into()),
            aff_broker_dealer: Some("Y".into()),
            drp_felony_conviction: Some("Y".into()),
            drp_sec_cftc_order: Some("Y".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_compensation_diversity_counts_truthy() {
        assert_eq!(compensation_diversity(&advisor_with_flags()), 3);
        assert_eq!(compensation_diversity(&AdvisorRecord::default()), 0);
    }

    #[test]
    fn test_business_complexity_counts_and_caps() {
        assert_eq!(business_complexity(&advisor_with_flags()), 2);
    }

    #[test]
    fn test_drp_severity_weighted_and_capped() {
        // Felony conviction (3.0) + SEC/CFTC order (2.0).
        assert_eq!(drp_severity(&advisor_with_flags()), 5.0);

        let mut everything = AdvisorRecord::default();
        everything.drp_felony_conviction = Some("Y".into());
        everything.drp_felony_charge = Some("Y".into());
        everything.drp_misdemeanor_conviction = Some("Y".into());
        everything.drp_sec_cftc_finding = Some("Y".into());
        everything.drp_sec_cftc_order = Some("Y".into());
        everything.drp_bar_or_suspension = Some("Y".into());
        assert_eq!(drp_severity(&everything), 10.0);
    }

    #[test]
    fn test_concentration_risk_components() {
        // Fully diversified, retained book scores zero.
        let low = concentration_risk(Some(0.0), Some(0.0), Some(100.0)).unwrap();
        assert_eq!(low, 0.0);

        // Single-client book maxes every component.
        let high = concentration_risk(Some(1.0), Some(100.0), Some(0.0)).unwrap();
        assert_eq!(high, 10.0);

        // Missing everything is unknown, not zero.
        assert!(concentration_risk(None, None, None).is_none());
    }

    #[test]
    fn test_key_person_dependency_tiers() {
        // Single owner, no protections, dominant key person.
        let worst = key_person_dependency(Some(1), false, false, Some(80.0), false);
        assert_eq!(worst, 9.0);

        let moderate = key_person_dependency(Some(2), true, true, Some(30.0), true);
        assert_eq!(moderate, 3.0);

        let best = key_person_dependency(Some(6), true, true, Some(10.0), true);
        assert_eq!(best, 0.0);
    }

    #[test]
    fn test_acquisition_readiness_bounds() {
        let strong = ReadinessInputs {
            fee_schedule_parsed: true,
            aum_growth: Some(0.12),
            client_growth: Some(0.04),
            drp_severity: 0.0,
            succession_plan: true,
            code_of_ethics: true,
            business_complexity: 2,
            compensation_diversity: 3,
            mean_confidence: Some(0.85),
            amendments_per_year: Some(1.0),
        };
        assert_eq!(acquisition_readiness(&strong), 100.0);

        let weak = ReadinessInputs {
            drp_severity: 8.0,
            business_complexity: 20,
            amendments_per_year: Some(5.0),
            ..Default::default()
        };
        assert_eq!(acquisition_readiness(&weak), 30.0);
    }

    #[test]
    fn test_regulatory_risk_terms_capped() {
        let score = regulatory_risk(10.0, 5, 10, Some(6.0));
        // 40 + min(50,30) + min(50,20) + min(15,10) = 100.
        assert_eq!(score, 100.0);

        assert_eq!(regulatory_risk(0.0, 0, 0, None), 0.0);
        // Amendment term only kicks in above 3/yr.
        assert_eq!(regulatory_risk(0.0, 0, 0, Some(2.0)), 0.0);
    }

    #[test]
    fn test_profitability_split_and_fallback() {
        let advisor = AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            total_employees: Some(10),
            advisory_employees: Some(4),
            ..Default::default()
        };
        let p = profitability(&advisor, 2_500_000).unwrap();
        // 6 support x 150k + 4 advisors x 250k = 1.9M.
        assert_eq!(p.estimated_expenses, 1_900_000);
        assert!((p.expense_ratio - 0.76).abs() < 1e-9);
        assert!((p.operating_margin - 0.24).abs() < 1e-9);
        assert_eq!(p.revenue_per_employee, 250_000);

        let no_split = AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            total_employees: Some(10),
            ..Default::default()
        };
        let p = profitability(&no_split, 2_500_000).unwrap();
        assert_eq!(p.estimated_expenses, 1_750_000);

        assert!(profitability(&AdvisorRecord::default(), 2_500_000).is_none());
    }
}
