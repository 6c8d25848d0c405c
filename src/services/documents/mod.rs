//! Document assembler: turns raw filing rows into the per-run `AdvisorDocs`
//! corpus and routes question-specific context out of it.

pub mod sectioner;

use crate::models::{AdvisorDocs, AdvisorRecord, Brochure, CrsFiling, Owner, PrivateFund};
use crate::questions::{Question, SourceDoc};
use crate::utils::text::{fmt_dollars, truncate_chars};

pub use sectioner::{FULL_SECTION, item_title, section_brochure, sections_for_items};

/// Whole-brochure context cap when a question names no sections.
const BROCHURE_CONTEXT_MAX_CHARS: usize = 15_000;
/// CRS context cap.
const CRS_CONTEXT_MAX_CHARS: usize = 8_000;

/// Questions that additionally receive the owners schedule blob.
const OWNER_CONTEXT_KEYS: [&str; 4] =
    ["ownership_structure", "employee_ownership", "subsidiaries", "acquisition_history"];

/// One row of the document-section coverage index.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionIndexRow {
    pub crd_number: i64,
    pub doc_type: String,
    pub doc_id: i64,
    pub section_key: String,
    pub title: String,
    pub char_length: i64,
    pub token_estimate: i64,
}

// ============================================================================
// Assembly
// ============================================================================

/// Build the read-only document set for one advisor, plus the section index
/// rows for coverage tracking.
///
/// Brochures are expected most-recent-first; the first non-empty one is
/// sectioned. The first CRS filing wins.
pub fn assemble(
    advisor: AdvisorRecord,
    brochures: &[Brochure],
    crs: &[CrsFiling],
    owners: &[Owner],
    funds: Vec<PrivateFund>,
) -> (AdvisorDocs, Vec<SectionIndexRow>) {
    let part1_formatted = format_part1(&advisor);
    let owners_formatted = format_owners(owners);

    let active_brochure = brochures.iter().find(|b| !b.text.trim().is_empty());
    let brochure_sections = section_brochure(
        active_brochure.map(|b| b.text.as_str()).unwrap_or_default(),
    );

    let section_index = active_brochure
        .map(|brochure| {
            brochure_sections
                .iter()
                .filter(|(key, _)| key.as_str() != FULL_SECTION)
                .map(|(key, text)| {
                    let char_length = text.chars().count() as i64;
                    SectionIndexRow {
                        crd_number: advisor.crd_number,
                        doc_type: "brochure".to_string(),
                        doc_id: brochure.id,
                        section_key: key.clone(),
                        title: item_title(key),
                        char_length,
                        token_estimate: char_length / 4,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let crs_text = crs.first().map(|c| c.text.clone()).unwrap_or_default();

    let docs = AdvisorDocs {
        crd_number: advisor.crd_number,
        firm_name: advisor.firm_name.clone(),
        part1_formatted,
        brochure_sections,
        crs_text,
        owners_formatted,
        funds,
        advisor,
    };
    (docs, section_index)
}

/// Fixed-order human-readable rendering of the Part 1 structured fields.
pub fn format_part1(advisor: &AdvisorRecord) -> String {
    let mut out = String::with_capacity(2_048);

    out.push_str("FIRM IDENTITY\n");
    line(&mut out, "Firm name", Some(advisor.firm_name.clone()));
    line(&mut out, "Legal name", advisor.legal_name.clone());
    line(&mut out, "CRD number", Some(advisor.crd_number.to_string()));
    line(&mut out, "SEC number", advisor.sec_number.clone());

    out.push_str("\nASSETS UNDER MANAGEMENT\n");
    line(&mut out, "Total regulatory AUM", advisor.total_aum.map(fmt_dollars));
    line(&mut out, "Discretionary AUM", advisor.discretionary_aum.map(fmt_dollars));
    line(&mut out, "Non-discretionary AUM", advisor.non_discretionary_aum.map(fmt_dollars));
    line(&mut out, "Total accounts", advisor.total_accounts.map(|n| n.to_string()));
    if let (Some(aum), Some(accounts)) = (advisor.total_aum, advisor.total_accounts) {
        if accounts > 0 {
            line(&mut out, "Average account size", Some(fmt_dollars(aum / accounts)));
        }
    }

    out.push_str("\nHEADCOUNT\n");
    line(&mut out, "Total employees", advisor.total_employees.map(|n| n.to_string()));
    line(&mut out, "Advisory employees", advisor.advisory_employees.map(|n| n.to_string()));
    line(&mut out, "Total clients", advisor.total_clients.map(|n| n.to_string()));

    let client_types = advisor.client_types();
    if !client_types.is_empty() {
        out.push_str("\nCLIENT TYPES\n");
        for entry in &client_types {
            let mut parts = Vec::new();
            if let Some(count) = entry.count {
                parts.push(format!("{} clients", count));
            }
            if let Some(pct) = entry.pct_aum {
                parts.push(format!("{:.1}% of AUM", pct));
            }
            out.push_str(&format!("  - {}: {}\n", entry.name, parts.join(", ")));
        }
    }

    out.push_str("\nCOMPENSATION ARRANGEMENTS\n");
    for (label, value) in [
        ("Percentage of AUM", &advisor.comp_pct_of_aum),
        ("Hourly charges", &advisor.comp_hourly),
        ("Subscription fees", &advisor.comp_subscription),
        ("Fixed fees", &advisor.comp_fixed),
        ("Commissions", &advisor.comp_commission),
        ("Performance-based fees", &advisor.comp_performance),
        ("Other", &advisor.comp_other),
    ] {
        flag_line(&mut out, label, value);
    }

    out.push_str("\nREGISTRATION\n");
    flag_line(&mut out, "SEC registered", &advisor.sec_registered);
    flag_line(&mut out, "State registered", &advisor.state_registered);
    flag_line(&mut out, "Exempt reporting adviser", &advisor.exempt_reporting);
    line(&mut out, "Registration states", advisor.registration_states.clone());

    out.push_str("\nDISCIPLINARY DISCLOSURES\n");
    for (label, value) in [
        ("Felony conviction", &advisor.drp_felony_conviction),
        ("Felony charge", &advisor.drp_felony_charge),
        ("Misdemeanor conviction", &advisor.drp_misdemeanor_conviction),
        ("SEC/CFTC finding", &advisor.drp_sec_cftc_finding),
        ("SEC/CFTC order", &advisor.drp_sec_cftc_order),
        ("Other regulatory finding", &advisor.drp_regulatory_finding),
        ("Other regulatory order", &advisor.drp_regulatory_order),
        ("Civil injunction", &advisor.drp_civil_injunction),
        ("Civil finding", &advisor.drp_civil_finding),
        ("Bar or suspension", &advisor.drp_bar_or_suspension),
    ] {
        flag_line(&mut out, label, value);
    }

    out.push_str("\nCUSTODY\n");
    flag_line(&mut out, "Custody of client cash", &advisor.custody_cash);
    flag_line(&mut out, "Custody of client securities", &advisor.custody_securities);
    flag_line(&mut out, "Related person custody", &advisor.custody_related_person);

    out.push_str("\nCLIENT TRANSACTIONS\n");
    flag_line(&mut out, "Principal transactions", &advisor.principal_transactions);
    flag_line(&mut out, "Agency cross transactions", &advisor.agency_cross_transactions);
    flag_line(&mut out, "Recommends securities with interest", &advisor.recommends_with_interest);

    out.push_str("\nOTHER BUSINESS AND AFFILIATIONS\n");
    for (label, value) in [
        ("Broker-dealer business", &advisor.biz_broker_dealer),
        ("Registered representative", &advisor.biz_registered_rep),
        ("CPO/CTA business", &advisor.biz_cpo_cta),
        ("Futures commission merchant", &advisor.biz_futures_merchant),
        ("Real estate business", &advisor.biz_real_estate),
        ("Insurance business", &advisor.biz_insurance),
        ("Banking business", &advisor.biz_bank),
        ("Trust company business", &advisor.biz_trust_company),
        ("Municipal advisor business", &advisor.biz_municipal_advisor),
        ("Swap dealer business", &advisor.biz_swap_dealer),
        ("Accounting business", &advisor.biz_accountant),
        ("Legal business", &advisor.biz_lawyer),
        ("Other business", &advisor.biz_other),
        ("Affiliated broker-dealer", &advisor.aff_broker_dealer),
        ("Affiliated investment company", &advisor.aff_investment_company),
        ("Affiliated adviser", &advisor.aff_other_adviser),
        ("Affiliated futures merchant", &advisor.aff_futures_merchant),
        ("Affiliated bank", &advisor.aff_bank),
        ("Affiliated insurance company", &advisor.aff_insurance),
        ("Affiliated pension consultant", &advisor.aff_pension_consultant),
        ("Affiliated real estate", &advisor.aff_real_estate),
        ("Affiliated sponsor/GP of LPs", &advisor.aff_sponsor_lp),
        ("Affiliated trust company", &advisor.aff_trust_company),
        ("Affiliated accountant", &advisor.aff_accountant),
        ("Affiliated lawyer", &advisor.aff_lawyer),
    ] {
        flag_line(&mut out, label, value);
    }

    out.push_str("\nOFFICES\n");
    line(
        &mut out,
        "Main office",
        match (&advisor.main_office_city, &advisor.main_office_state) {
            (Some(city), Some(state)) => Some(format!("{}, {}", city, state)),
            (Some(city), None) => Some(city.clone()),
            (None, Some(state)) => Some(state.clone()),
            (None, None) => None,
        },
    );
    line(&mut out, "Total offices", advisor.office_count.map(|n| n.to_string()));

    out
}

/// Bulleted owners schedule with ownership percentages.
pub fn format_owners(owners: &[Owner]) -> String {
    if owners.is_empty() {
        return String::new();
    }
    let mut out = String::from("OWNERSHIP SCHEDULE\n");
    for owner in owners {
        out.push_str("  - ");
        out.push_str(&owner.owner_name);
        if let Some(title) = &owner.title {
            out.push_str(&format!(", {}", title));
        }
        if let Some(pct) = owner.ownership_pct {
            out.push_str(&format!(" ({:.1}% ownership)", pct));
        }
        out.push('\n');
    }
    out
}

fn line(out: &mut String, label: &str, value: Option<String>) {
    if let Some(v) = value {
        out.push_str(&format!("  - {}: {}\n", label, v));
    }
}

fn flag_line(out: &mut String, label: &str, value: &Option<String>) {
    if let Some(v) = value {
        let yes = matches!(v.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "true");
        out.push_str(&format!("  - {}: {}\n", label, if yes { "Yes" } else { "No" }));
    }
}

// ============================================================================
// Question routing
// ============================================================================

/// Build the document context for one question, concatenating sources in the
/// question's declared order.
pub fn document_for_question(docs: &AdvisorDocs, question: &Question) -> String {
    let mut parts: Vec<String> = Vec::new();

    for doc in &question.source_docs {
        match doc {
            SourceDoc::Part1 => {
                if !docs.part1_formatted.is_empty() {
                    parts.push(docs.part1_formatted.clone());
                }
            },
            SourceDoc::Part2 => {
                let text = if question.source_sections.is_empty() {
                    docs.brochure_sections
                        .get(FULL_SECTION)
                        .map(|full| truncate_chars(full, BROCHURE_CONTEXT_MAX_CHARS))
                        .unwrap_or_default()
                } else {
                    sections_for_items(&docs.brochure_sections, &question.source_sections)
                };
                if !text.is_empty() {
                    parts.push(text);
                }
            },
            SourceDoc::Part3 => {
                if !docs.crs_text.is_empty() {
                    parts.push(truncate_chars(&docs.crs_text, CRS_CONTEXT_MAX_CHARS));
                }
            },
        }
    }

    if OWNER_CONTEXT_KEYS.contains(&question.key) && !docs.owners_formatted.is_empty() {
        parts.push(docs.owners_formatted.clone());
    }

    parts.join("\n\n")
}

/// Build the per-fund context: structured fund fields plus any brochure
/// sections that mention the fund by name.
pub fn fund_context(docs: &AdvisorDocs, fund: &PrivateFund) -> String {
    let mut out = String::with_capacity(1_024);
    out.push_str("FUND RECORD\n");
    line(&mut out, "Fund name", Some(fund.fund_name.clone()));
    line(&mut out, "Fund ID", Some(fund.fund_id.clone()));
    line(&mut out, "Fund type", fund.fund_type.clone());
    line(&mut out, "Gross asset value", fund.gross_aum.map(fmt_dollars));
    line(&mut out, "Net asset value", fund.net_aum.map(fmt_dollars));
    line(&mut out, "Minimum investment", fund.min_investment.map(fmt_dollars));
    line(&mut out, "Beneficial owners", fund.beneficial_owners.map(|n| n.to_string()));
    line(&mut out, "Exemption", fund.exemption.clone());

    let needle = fund.fund_name.to_lowercase();
    for (key, text) in &docs.brochure_sections {
        if key == FULL_SECTION {
            continue;
        }
        if text.to_lowercase().contains(&needle) {
            out.push_str(&format!("\n{}\n{}\n", item_title(key), text));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::question_map;

    fn advisor_fixture() -> AdvisorRecord {
        AdvisorRecord {
            crd_number: 104_512,
            firm_name: "Bluewater Capital Advisors".to_string(),
            total_aum: Some(1_000_000_000),
            discretionary_aum: Some(800_000_000),
            total_accounts: Some(400),
            total_employees: Some(25),
            comp_pct_of_aum: Some("Y".to_string()),
            comp_performance: Some("N".to_string()),
            client_types_json: Some(
                r#"[{"type": "High net worth individuals", "count": 300, "pct_aum": 70.0},
                    {"type": "Pension and profit sharing plans", "count": 12, "pct_aum": 30.0}]"#
                    .to_string(),
            ),
            main_office_city: Some("Portland".to_string()),
            main_office_state: Some("OR".to_string()),
            office_count: Some(2),
            ..Default::default()
        }
    }

    fn brochure_fixture() -> Brochure {
        Brochure {
            id: 7,
            crd_number: 104_512,
            title: Some("Form ADV Part 2A".to_string()),
            filing_date: None,
            text: "Item 4 - Advisory Business\nBluewater manages the Harbor Fund LP and client portfolios.\nItem 5 - Fees and Compensation\nFees are 1% of assets annually.".to_string(),
        }
    }

    #[test]
    fn test_part1_rendering_fixed_order() {
        let text = format_part1(&advisor_fixture());
        let identity = text.find("FIRM IDENTITY").unwrap();
        let aum = text.find("ASSETS UNDER MANAGEMENT").unwrap();
        let offices = text.find("OFFICES").unwrap();
        assert!(identity < aum && aum < offices);
        assert!(text.contains("$1,000,000,000"));
        assert!(text.contains("Average account size: $2,500,000"));
        assert!(text.contains("Percentage of AUM: Yes"));
        assert!(text.contains("Performance-based fees: No"));
        assert!(text.contains("High net worth individuals: 300 clients, 70.0% of AUM"));
    }

    #[test]
    fn test_assemble_builds_sections_and_index() {
        let (docs, index) = assemble(advisor_fixture(), &[brochure_fixture()], &[], &[], vec![]);
        assert!(docs.brochure_sections.contains_key("item_4"));
        assert!(docs.brochure_sections.contains_key("item_5"));
        assert!(docs.brochure_sections.contains_key(FULL_SECTION));

        // Index covers every non-full section with a char-based token estimate.
        assert_eq!(index.len(), 2);
        let row = index.iter().find(|r| r.section_key == "item_5").unwrap();
        assert_eq!(row.doc_type, "brochure");
        assert_eq!(row.doc_id, 7);
        assert_eq!(row.token_estimate, row.char_length / 4);
    }

    #[test]
    fn test_document_for_question_routes_sections() {
        let (docs, _) = assemble(advisor_fixture(), &[brochure_fixture()], &[], &[], vec![]);
        let q = question_map()["fee_schedule"];
        let context = document_for_question(&docs, q);
        assert!(context.contains("1% of assets"));
        assert!(!context.contains("FIRM IDENTITY"));
    }

    #[test]
    fn test_document_for_question_appends_owners_for_allowlist() {
        let owners = vec![Owner {
            crd_number: 104_512,
            owner_name: "Dana Whitfield".to_string(),
            title: Some("Managing Member".to_string()),
            ownership_pct: Some(100.0),
            is_control_person: Some("Y".to_string()),
        }];
        let (docs, _) = assemble(advisor_fixture(), &[brochure_fixture()], &[], &owners, vec![]);

        let ownership = document_for_question(&docs, question_map()["ownership_structure"]);
        assert!(ownership.contains("Dana Whitfield"));
        assert!(ownership.contains("100.0% ownership"));

        let fees = document_for_question(&docs, question_map()["fee_schedule"]);
        assert!(!fees.contains("Dana Whitfield"));
    }

    #[test]
    fn test_fund_context_includes_matching_sections() {
        let fund = PrivateFund {
            fund_id: "805-001".to_string(),
            crd_number: 104_512,
            fund_name: "Harbor Fund".to_string(),
            fund_type: Some("hedge fund".to_string()),
            gross_aum: Some(50_000_000),
            net_aum: Some(48_000_000),
            min_investment: None,
            beneficial_owners: Some(40),
            exemption: Some("3(c)(1)".to_string()),
        };
        let (docs, _) =
            assemble(advisor_fixture(), &[brochure_fixture()], &[], &[], vec![fund.clone()]);
        let context = fund_context(&docs, &fund);
        assert!(context.contains("Fund name: Harbor Fund"));
        assert!(context.contains("$50,000,000"));
        // Item 4 mentions the fund by name, item 5 does not.
        assert!(context.contains("Advisory Business"));
        assert!(!context.contains("Fees are 1%"));
    }
}
