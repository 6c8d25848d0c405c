//! Raw filing rows and the assembled per-advisor document set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

// ============================================================================
// Advisor (ADV Part 1 structured row)
// ============================================================================

/// Structured Part 1 fields for one advisor, as loaded from the filings store.
///
/// Yes/no items are stored as the raw filing strings ("Y"/"N") rather than
/// booleans; the bypass layer applies the shared truthiness predicate.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct AdvisorRecord {
    pub crd_number: i64,
    pub firm_name: String,
    pub legal_name: Option<String>,
    pub sec_number: Option<String>,

    // Registration (Item 2)
    pub sec_registered: Option<String>,
    pub state_registered: Option<String>,
    pub exempt_reporting: Option<String>,
    pub registration_states: Option<String>,

    // Offices (Item 1F)
    pub main_office_city: Option<String>,
    pub main_office_state: Option<String>,
    pub office_count: Option<i64>,

    // Regulatory assets (Item 5F)
    pub total_aum: Option<i64>,
    pub discretionary_aum: Option<i64>,
    pub non_discretionary_aum: Option<i64>,
    pub total_accounts: Option<i64>,
    pub discretionary_accounts: Option<i64>,

    // Headcount and clients (Items 5A-5D)
    pub total_employees: Option<i64>,
    pub advisory_employees: Option<i64>,
    pub total_clients: Option<i64>,
    /// JSON list of `{"type": ..., "count": ..., "pct_aum": ...}` entries.
    pub client_types_json: Option<String>,

    // Compensation arrangements (Item 5E)
    pub comp_pct_of_aum: Option<String>,
    pub comp_hourly: Option<String>,
    pub comp_subscription: Option<String>,
    pub comp_fixed: Option<String>,
    pub comp_commission: Option<String>,
    pub comp_performance: Option<String>,
    pub comp_other: Option<String>,

    // Other business activities (Item 6)
    pub biz_broker_dealer: Option<String>,
    pub biz_registered_rep: Option<String>,
    pub biz_cpo_cta: Option<String>,
    pub biz_futures_merchant: Option<String>,
    pub biz_real_estate: Option<String>,
    pub biz_insurance: Option<String>,
    pub biz_bank: Option<String>,
    pub biz_trust_company: Option<String>,
    pub biz_municipal_advisor: Option<String>,
    pub biz_swap_dealer: Option<String>,
    pub biz_accountant: Option<String>,
    pub biz_lawyer: Option<String>,
    pub biz_other: Option<String>,

    // Financial industry affiliations (Item 7A)
    pub aff_broker_dealer: Option<String>,
    pub aff_investment_company: Option<String>,
    pub aff_other_adviser: Option<String>,
    pub aff_futures_merchant: Option<String>,
    pub aff_bank: Option<String>,
    pub aff_insurance: Option<String>,
    pub aff_pension_consultant: Option<String>,
    pub aff_real_estate: Option<String>,
    pub aff_sponsor_lp: Option<String>,
    pub aff_trust_company: Option<String>,
    pub aff_accountant: Option<String>,
    pub aff_lawyer: Option<String>,

    // Participation / cross trading (Item 8)
    pub principal_transactions: Option<String>,
    pub agency_cross_transactions: Option<String>,
    pub recommends_with_interest: Option<String>,

    // Custody (Item 9)
    pub custody_cash: Option<String>,
    pub custody_securities: Option<String>,
    pub custody_related_person: Option<String>,

    // Disclosure reporting pages (Item 11)
    pub drp_felony_conviction: Option<String>,
    pub drp_felony_charge: Option<String>,
    pub drp_misdemeanor_conviction: Option<String>,
    pub drp_sec_cftc_finding: Option<String>,
    pub drp_sec_cftc_order: Option<String>,
    pub drp_regulatory_finding: Option<String>,
    pub drp_regulatory_order: Option<String>,
    pub drp_civil_injunction: Option<String>,
    pub drp_civil_finding: Option<String>,
    pub drp_bar_or_suspension: Option<String>,

    pub latest_filing_date: Option<NaiveDate>,
}

/// One entry of the Item 5D client-type breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTypeEntry {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub pct_aum: Option<f64>,
}

impl AdvisorRecord {
    /// Parsed Item 5D breakdown. Empty on missing or malformed JSON.
    pub fn client_types(&self) -> Vec<ClientTypeEntry> {
        self.client_types_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

// ============================================================================
// Other filing documents
// ============================================================================

/// A Part 2 brochure filing (narrative free text).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Brochure {
    pub id: i64,
    pub crd_number: i64,
    pub title: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub text: String,
}

/// A Part 3 client relationship summary filing.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CrsFiling {
    pub id: i64,
    pub crd_number: i64,
    pub filing_date: Option<NaiveDate>,
    pub text: String,
}

/// One row from the ownership schedule (Schedule A/B).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Owner {
    pub crd_number: i64,
    pub owner_name: String,
    pub title: Option<String>,
    pub ownership_pct: Option<f64>,
    pub is_control_person: Option<String>,
}

/// A private fund reported on Schedule D 7.B.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PrivateFund {
    pub fund_id: String,
    pub crd_number: i64,
    pub fund_name: String,
    pub fund_type: Option<String>,
    pub gross_aum: Option<i64>,
    pub net_aum: Option<i64>,
    pub min_investment: Option<i64>,
    pub beneficial_owners: Option<i64>,
    /// Regulatory exemption relied on, e.g. "3(c)(1)" or "3(c)(7)".
    pub exemption: Option<String>,
}

/// One historical filing snapshot, used for growth metrics.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FilingSnapshot {
    pub crd_number: i64,
    pub filing_date: NaiveDate,
    pub filing_type: Option<String>,
    pub total_aum: Option<i64>,
    pub total_accounts: Option<i64>,
    pub total_employees: Option<i64>,
    pub total_clients: Option<i64>,
}

/// Fleet-run advisor selection filter.
#[derive(Debug, Clone, Default)]
pub struct AdvisorFilter {
    pub min_aum: Option<i64>,
    pub state: Option<String>,
    pub skip_extracted: bool,
    pub limit: Option<i64>,
}

// ============================================================================
// Assembled document set
// ============================================================================

/// Everything the extraction pipeline reads for one advisor.
///
/// Constructed once per run by the document assembler; read-only afterwards.
#[derive(Debug, Clone)]
pub struct AdvisorDocs {
    pub crd_number: i64,
    pub firm_name: String,
    /// Part 1 rendered as a fixed-order human-readable blob.
    pub part1_formatted: String,
    /// Brochure item key -> section text. Always contains `"full"`.
    pub brochure_sections: BTreeMap<String, String>,
    pub crs_text: String,
    pub owners_formatted: String,
    pub funds: Vec<PrivateFund>,
    /// Raw Part 1 row, kept for the structured bypass.
    pub advisor: AdvisorRecord,
}
