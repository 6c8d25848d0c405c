//! Structured bypass: answers routed straight off Part 1 fields.
//!
//! No model call is made. Answers carry tier 0 and confidence 1.0; when a
//! required field is missing the answer is still emitted with a null value
//! and confidence 0.0 so coverage tracking can tell "tried, no data" apart
//! from "never asked".

use std::collections::BTreeMap;

use crate::models::{AdvisorDocs, Answer, AnswerValue, PrivateFund};
use crate::questions::Question;

pub const BYPASS_MODEL: &str = "structured_bypass";

/// Client types counted as institutional for the retail split.
const INSTITUTIONAL_MARKERS: [&str; 9] = [
    "pension",
    "endowment",
    "foundation",
    "corporation",
    "state",
    "municipal",
    "sovereign",
    "insurance",
    "investment company",
];

// ============================================================================
// Advisor scope
// ============================================================================

/// Answer one advisor-scope bypass question from the raw Part 1 row.
pub fn bypass_answer(question: &Question, docs: &AdvisorDocs) -> Answer {
    let advisor = &docs.advisor;
    match question.key {
        "current_aum" => match advisor.total_aum {
            Some(aum) => answered(question, AnswerValue::Integer(aum), "Item 5F regulatory AUM"),
            None => missing(question),
        },
        "discretionary_vs_nondiscretionary" => {
            match (advisor.total_aum, advisor.discretionary_aum) {
                (Some(total), Some(discretionary)) if total > 0 => {
                    let disc_pct = round2(discretionary as f64 / total as f64 * 100.0);
                    let value = map_value([
                        ("discretionary_pct", AnswerValue::Number(disc_pct)),
                        ("non_discretionary_pct", AnswerValue::Number(round2(100.0 - disc_pct))),
                    ]);
                    answered(question, value, "Item 5F discretionary split")
                },
                _ => missing(question),
            }
        },
        "average_account_size" => match (advisor.total_aum, advisor.total_accounts) {
            (Some(aum), Some(accounts)) if accounts > 0 => answered(
                question,
                AnswerValue::Integer(aum / accounts),
                "Total AUM divided by total accounts",
            ),
            _ => missing(question),
        },
        "total_clients" => {
            let from_row = advisor.total_clients;
            let from_breakdown = {
                let counts: Vec<i64> =
                    advisor.client_types().iter().filter_map(|t| t.count).collect();
                (!counts.is_empty()).then(|| counts.iter().sum())
            };
            match from_row.or(from_breakdown) {
                Some(clients) => {
                    answered(question, AnswerValue::Integer(clients), "Item 5C client count")
                },
                None => missing(question),
            }
        },
        "employee_count" => match advisor.total_employees {
            Some(n) => answered(question, AnswerValue::Integer(n), "Item 5A total employees"),
            None => missing(question),
        },
        "compensation_types" => {
            let flags = [
                ("percentage_of_aum", &advisor.comp_pct_of_aum),
                ("hourly", &advisor.comp_hourly),
                ("subscription", &advisor.comp_subscription),
                ("fixed_fees", &advisor.comp_fixed),
                ("commissions", &advisor.comp_commission),
                ("performance_based", &advisor.comp_performance),
                ("other", &advisor.comp_other),
            ];
            if flags.iter().all(|(_, v)| v.is_none()) {
                return missing(question);
            }
            let types: Vec<AnswerValue> = flags
                .iter()
                .filter(|(_, v)| flag_truthy(v).unwrap_or(false))
                .map(|(name, _)| AnswerValue::Text(name.to_string()))
                .collect();
            answered(question, AnswerValue::List(types), "Item 5E compensation arrangements")
        },
        "regulatory_status" => {
            let fields = [
                ("sec_registered", &advisor.sec_registered),
                ("state_registered", &advisor.state_registered),
                ("exempt_reporting", &advisor.exempt_reporting),
            ];
            if fields.iter().all(|(_, v)| v.is_none()) {
                return missing(question);
            }
            let value = map_value(
                fields
                    .iter()
                    .map(|(name, v)| (*name, AnswerValue::Bool(flag_truthy(v).unwrap_or(false)))),
            );
            answered(question, value, "Item 2 registration status")
        },
        "disciplinary_history" => {
            let flags = drp_flags(advisor);
            if flags.iter().all(|(_, v)| v.is_none()) {
                return missing(question);
            }
            let mut entries: Vec<(&str, AnswerValue)> = flags
                .iter()
                .map(|(name, v)| (*name, AnswerValue::Bool(flag_truthy(v).unwrap_or(false))))
                .collect();
            let any = entries.iter().any(|(_, v)| v.is_truthy());
            entries.push(("any_disclosures", AnswerValue::Bool(any)));
            answered(question, map_value(entries), "Item 11 disclosure flags")
        },
        "cross_trading_practices" => {
            let fields = [
                ("principal_transactions", &advisor.principal_transactions),
                ("agency_cross_transactions", &advisor.agency_cross_transactions),
                ("recommends_with_interest", &advisor.recommends_with_interest),
            ];
            if fields.iter().all(|(_, v)| v.is_none()) {
                return missing(question);
            }
            let value = map_value(
                fields
                    .iter()
                    .map(|(name, v)| (*name, AnswerValue::Bool(flag_truthy(v).unwrap_or(false)))),
            );
            answered(question, value, "Item 8 participation flags")
        },
        "office_locations" => {
            if advisor.main_office_city.is_none()
                && advisor.main_office_state.is_none()
                && advisor.office_count.is_none()
            {
                return missing(question);
            }
            let mut entries = Vec::new();
            let office = match (&advisor.main_office_city, &advisor.main_office_state) {
                (Some(city), Some(state)) => Some(format!("{}, {}", city, state)),
                (Some(city), None) => Some(city.clone()),
                (None, Some(state)) => Some(state.clone()),
                (None, None) => None,
            };
            if let Some(office) = office {
                entries.push(("main_office", AnswerValue::Text(office)));
            }
            if let Some(count) = advisor.office_count {
                entries.push(("office_count", AnswerValue::Integer(count)));
            }
            answered(question, map_value(entries), "Item 1F office information")
        },
        "hnw_concentration" => {
            let types = advisor.client_types();
            if types.is_empty() {
                return missing(question);
            }
            let pct: f64 = types
                .iter()
                .filter(|t| {
                    let name = t.name.to_lowercase();
                    name.contains("high net worth") || name.contains("hnw")
                })
                .filter_map(|t| t.pct_aum)
                .sum();
            answered(
                question,
                AnswerValue::Number(round2(pct)),
                "Share of AUM in high-net-worth client types",
            )
        },
        "institutional_vs_retail" => {
            let types = advisor.client_types();
            if types.is_empty() {
                return missing(question);
            }
            let (mut institutional, mut retail) = (0.0, 0.0);
            for entry in &types {
                let name = entry.name.to_lowercase();
                let pct = entry.pct_aum.unwrap_or(0.0);
                if INSTITUTIONAL_MARKERS.iter().any(|m| name.contains(m)) {
                    institutional += pct;
                } else {
                    retail += pct;
                }
            }
            let value = map_value([
                ("institutional_pct", AnswerValue::Number(round2(institutional))),
                ("retail_pct", AnswerValue::Number(round2(retail))),
            ]);
            answered(question, value, "Item 5D client type classification")
        },
        _ => missing(question),
    }
}

// ============================================================================
// Fund scope
// ============================================================================

/// Answer one fund-scope bypass question from the private fund record.
pub fn bypass_fund_answer(question: &Question, fund: &PrivateFund) -> Answer {
    let mut answer = match question.key {
        "fund_aum" => {
            if fund.gross_aum.is_none() && fund.net_aum.is_none() {
                missing(question)
            } else {
                let mut entries = Vec::new();
                if let Some(gross) = fund.gross_aum {
                    entries.push(("gross_aum", AnswerValue::Integer(gross)));
                }
                if let Some(net) = fund.net_aum {
                    entries.push(("net_aum", AnswerValue::Integer(net)));
                }
                answered(question, map_value(entries), "Schedule D 7.B fund assets")
            }
        },
        "fund_type" => match &fund.fund_type {
            Some(t) => answered(question, AnswerValue::Text(t.clone()), "Schedule D 7.B fund type"),
            None => missing(question),
        },
        "fund_regulatory_status" => match &fund.exemption {
            Some(e) => answered(
                question,
                AnswerValue::Text(e.clone()),
                "Investment Company Act exemption",
            ),
            None => missing(question),
        },
        _ => missing(question),
    };
    answer.fund_id = Some(fund.fund_id.clone());
    answer
}

// ============================================================================
// Helpers
// ============================================================================

fn answered(question: &Question, value: AnswerValue, reasoning: &str) -> Answer {
    Answer {
        confidence: 1.0,
        tier: 0,
        reasoning: reasoning.to_string(),
        source_doc: "part1".to_string(),
        model: BYPASS_MODEL.to_string(),
        ..Answer::new(question.key, value)
    }
}

fn missing(question: &Question) -> Answer {
    Answer {
        confidence: 0.0,
        tier: 0,
        reasoning: "Required Part 1 fields not present".to_string(),
        source_doc: "part1".to_string(),
        model: BYPASS_MODEL.to_string(),
        ..Answer::new(question.key, AnswerValue::Null)
    }
}

fn flag_truthy(value: &Option<String>) -> Option<bool> {
    value.as_ref().map(|v| AnswerValue::Text(v.clone()).is_truthy())
}

fn map_value<'a>(entries: impl IntoIterator<Item = (&'a str, AnswerValue)>) -> AnswerValue {
    AnswerValue::Map(
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<BTreeMap<_, _>>(),
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn drp_flags(advisor: &crate::models::AdvisorRecord) -> [(&'static str, &Option<String>); 10] {
    [
        ("felony_conviction", &advisor.drp_felony_conviction),
        ("felony_charge", &advisor.drp_felony_charge),
        ("misdemeanor_conviction", &advisor.drp_misdemeanor_conviction),
        ("sec_cftc_finding", &advisor.drp_sec_cftc_finding),
        ("sec_cftc_order", &advisor.drp_sec_cftc_order),
        ("regulatory_finding", &advisor.drp_regulatory_finding),
        ("regulatory_order", &advisor.drp_regulatory_order),
        ("civil_injunction", &advisor.drp_civil_injunction),
        ("civil_finding", &advisor.drp_civil_finding),
        ("bar_or_suspension", &advisor.drp_bar_or_suspension),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdvisorRecord;
    use crate::questions::question_map;
    use crate::services::documents::assemble;

    fn docs_for(advisor: AdvisorRecord) -> AdvisorDocs {
        assemble(advisor, &[], &[], &[], vec![]).0
    }

    #[test]
    fn test_discretionary_split_sums_to_hundred() {
        let docs = docs_for(AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            total_aum: Some(1_000_000_000),
            discretionary_aum: Some(800_000_000),
            ..Default::default()
        });
        let answer = bypass_answer(question_map()["discretionary_vs_nondiscretionary"], &docs);
        assert_eq!(answer.confidence, 1.0);
        assert_eq!(answer.tier, 0);
        let AnswerValue::Map(map) = &answer.value else { panic!("expected map") };
        assert_eq!(map["discretionary_pct"], AnswerValue::Number(80.0));
        assert_eq!(map["non_discretionary_pct"], AnswerValue::Number(20.0));
    }

    #[test]
    fn test_missing_data_still_emits_answer() {
        let docs = docs_for(AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            ..Default::default()
        });
        let answer = bypass_answer(question_map()["current_aum"], &docs);
        assert!(answer.value.is_null());
        assert_eq!(answer.confidence, 0.0);
        assert_eq!(answer.model, BYPASS_MODEL);
        assert_eq!(answer.source_doc, "part1");
    }

    #[test]
    fn test_average_account_size_integer_division() {
        let docs = docs_for(AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            total_aum: Some(1_000_000_001),
            total_accounts: Some(3),
            ..Default::default()
        });
        let answer = bypass_answer(question_map()["average_account_size"], &docs);
        assert_eq!(answer.value, AnswerValue::Integer(333_333_333));
    }

    #[test]
    fn test_compensation_types_lists_truthy_flags() {
        let docs = docs_for(AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            comp_pct_of_aum: Some("Y".into()),
            comp_fixed: Some("yes".into()),
            comp_commission: Some("N".into()),
            ..Default::default()
        });
        let answer = bypass_answer(question_map()["compensation_types"], &docs);
        let AnswerValue::List(types) = &answer.value else { panic!("expected list") };
        let names: Vec<&str> = types.iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(names, vec!["percentage_of_aum", "fixed_fees"]);
    }

    #[test]
    fn test_hnw_and_institutional_detection() {
        let docs = docs_for(AdvisorRecord {
            crd_number: 1,
            firm_name: "Test".into(),
            client_types_json: Some(
                r#"[{"type": "HNW Individuals", "pct_aum": 55.0},
                    {"type": "Pension and profit sharing plans", "pct_aum": 30.0},
                    {"type": "Other individuals", "pct_aum": 15.0}]"#
                    .to_string(),
            ),
            ..Default::default()
        });

        let hnw = bypass_answer(question_map()["hnw_concentration"], &docs);
        assert_eq!(hnw.value, AnswerValue::Number(55.0));

        let split = bypass_answer(question_map()["institutional_vs_retail"], &docs);
        let AnswerValue::Map(map) = &split.value else { panic!("expected map") };
        assert_eq!(map["institutional_pct"], AnswerValue::Number(30.0));
        assert_eq!(map["retail_pct"], AnswerValue::Number(70.0));
    }

    #[test]
    fn test_fund_bypass_carries_fund_id() {
        let fund = PrivateFund {
            fund_id: "805-42".to_string(),
            crd_number: 1,
            fund_name: "Test Fund".to_string(),
            fund_type: Some("hedge fund".to_string()),
            gross_aum: Some(10_000_000),
            net_aum: Some(9_000_000),
            min_investment: None,
            beneficial_owners: None,
            exemption: None,
        };
        let answer = bypass_fund_answer(question_map()["fund_aum"], &fund);
        assert_eq!(answer.fund_id.as_deref(), Some("805-42"));
        let AnswerValue::Map(map) = &answer.value else { panic!("expected map") };
        assert_eq!(map["gross_aum"], AnswerValue::Integer(10_000_000));

        let status = bypass_fund_answer(question_map()["fund_regulatory_status"], &fund);
        assert!(status.value.is_null());
        assert_eq!(status.confidence, 0.0);
        assert_eq!(status.fund_id.as_deref(), Some("805-42"));
    }
}
