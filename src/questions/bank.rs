//! The registered question bank.
//!
//! Declaration order is load-bearing only for display; routing is driven by
//! the per-question metadata. Keys are stable across releases because they
//! are the persistence conflict keys.

use super::{Category as Cat, OutputFormat, Question, SourceDoc};
use crate::models::Scope;

/// Stable bank size, asserted by tests.
pub(super) const QUESTION_COUNT: usize = 240;

// ============================================================================
// Builder helpers
// ============================================================================

fn q(key: &'static str, tier: u8, category: Cat, text: &'static str) -> Question {
    Question {
        key,
        text,
        tier,
        category: Some(category),
        scope: Scope::Advisor,
        source_docs: vec![SourceDoc::Part2],
        source_sections: vec![],
        structured_bypass: false,
        output_format: OutputFormat::Text,
    }
}

fn fund(key: &'static str, tier: u8, text: &'static str) -> Question {
    Question {
        key,
        text,
        tier,
        category: None,
        scope: Scope::Fund,
        source_docs: vec![SourceDoc::Part1],
        source_sections: vec![],
        structured_bypass: false,
        output_format: OutputFormat::Text,
    }
}

impl Question {
    fn docs(mut self, docs: &[SourceDoc]) -> Self {
        self.source_docs = docs.to_vec();
        self
    }

    fn sections(mut self, sections: &[&'static str]) -> Self {
        self.source_sections = sections.to_vec();
        self
    }

    fn bypass(mut self) -> Self {
        self.structured_bypass = true;
        self.source_docs = vec![SourceDoc::Part1];
        self
    }

    fn number(mut self) -> Self {
        self.output_format = OutputFormat::Number;
        self
    }

    fn integer(mut self) -> Self {
        self.output_format = OutputFormat::Integer;
        self
    }

    fn boolean(mut self) -> Self {
        self.output_format = OutputFormat::Boolean;
        self
    }

    fn json(mut self) -> Self {
        self.output_format = OutputFormat::Json;
        self
    }
}

// ============================================================================
// Bank
// ============================================================================

pub(super) fn build() -> Vec<Question> {
    let mut bank = Vec::with_capacity(QUESTION_COUNT);
    bank.extend(structured_bypass());
    bank.extend(firm_profile());
    bank.extend(assets());
    bank.extend(clients());
    bank.extend(fees());
    bank.extend(services());
    bank.extend(ownership());
    bank.extend(personnel());
    bank.extend(compliance());
    bank.extend(custody_trading());
    bank.extend(conflicts());
    bank.extend(affiliations());
    bank.extend(growth());
    bank.extend(operations());
    bank.extend(readiness());
    bank.extend(fund_questions());
    bank
}

/// Answered straight off the Part 1 row, no model call (tier 0 at runtime).
fn structured_bypass() -> Vec<Question> {
    vec![
        q("current_aum", 1, Cat::B, "Total regulatory assets under management.").bypass().number(),
        q(
            "discretionary_vs_nondiscretionary",
            1,
            Cat::B,
            "Discretionary and non-discretionary AUM split as percentages.",
        )
        .bypass()
        .json(),
        q("average_account_size", 1, Cat::B, "Average account size across all accounts.")
            .bypass()
            .integer(),
        q("total_clients", 1, Cat::C, "Total number of advisory clients.").bypass().integer(),
        q("employee_count", 1, Cat::G, "Total firm headcount.").bypass().integer(),
        q("compensation_types", 1, Cat::D, "Compensation arrangements the firm reports.")
            .bypass()
            .json(),
        q("regulatory_status", 1, Cat::A, "SEC/state registration and exempt-reporting status.")
            .bypass()
            .json(),
        q("disciplinary_history", 1, Cat::H, "Disclosure reporting page flags.").bypass().json(),
        q(
            "cross_trading_practices",
            1,
            Cat::I,
            "Principal transaction and agency-cross participation flags.",
        )
        .bypass()
        .json(),
        q("office_locations", 1, Cat::A, "Main office location and total office count.")
            .bypass()
            .json(),
        q(
            "hnw_concentration",
            1,
            Cat::C,
            "Share of regulatory AUM attributable to high-net-worth client types.",
        )
        .bypass()
        .number(),
        q(
            "institutional_vs_retail",
            1,
            Cat::C,
            "Institutional versus retail split of the client base.",
        )
        .bypass()
        .json(),
    ]
}

/// Category A - firm profile & registration.
fn firm_profile() -> Vec<Question> {
    vec![
        q("firm_overview", 1, Cat::A, "Summarize the firm's advisory business in 2-3 sentences: what it does, for whom, and how it is organized.")
            .sections(&["item_4"]),
        q("year_founded", 1, Cat::A, "In what year was the firm founded or registered? Return the four-digit year.")
            .sections(&["item_4"])
            .integer(),
        q("firm_legal_structure", 1, Cat::A, "What is the firm's legal structure (LLC, corporation, partnership, sole proprietorship)?")
            .sections(&["item_4"]),
        q("headquarters_location", 1, Cat::A, "Where is the firm headquartered (city and state)?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("states_of_operation", 1, Cat::A, "List the states where the firm is registered or notice-filed. Return a JSON array of two-letter state codes.")
            .docs(&[SourceDoc::Part1])
            .json(),
        q("branch_office_strategy", 2, Cat::A, "Does the firm operate branch offices, and is there a stated strategy around geographic presence?")
            .sections(&["item_4"]),
        q("dba_names", 1, Cat::A, "List any doing-business-as or brand names the firm uses. Return a JSON array of names.")
            .sections(&["item_4"])
            .json(),
        q("predecessor_firms", 2, Cat::A, "Does the brochure describe predecessor firms, prior registrations, or firm reorganizations?")
            .sections(&["item_4"]),
        q("other_regulatory_registrations", 1, Cat::A, "List other regulatory registrations held (CPO, CTA, broker-dealer, municipal advisor). Return a JSON array.")
            .docs(&[SourceDoc::Part1])
            .json(),
        q("material_changes_disclosed", 1, Cat::A, "What material changes since the last annual amendment does the brochure disclose?")
            .sections(&["item_2"]),
        q("advisory_business_scope", 1, Cat::A, "Describe the scope of advisory services: portfolio management, financial planning, consulting, wrap programs.")
            .sections(&["item_4"]),
        q("primary_business_model", 1, Cat::A, "Classify the primary business model: wealth management, institutional asset management, pension consulting, fund management, or hybrid.")
            .sections(&["item_4"]),
        q("client_facing_brand", 1, Cat::A, "What client-facing brand or trade name does the firm market under, if different from its legal name?")
            .sections(&["item_4"]),
        q("advisory_affiliate_names", 2, Cat::A, "List named advisory affiliates or related advisory entities. Return a JSON array of names.")
            .sections(&["item_4", "item_10"])
            .json(),
        q("fiscal_year_end", 1, Cat::A, "What is the firm's fiscal year end, if stated?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
    ]
}

/// Category B - assets under management.
fn assets() -> Vec<Question> {
    vec![
        q("aum_growth_narrative", 2, Cat::B, "Does the brochure describe AUM growth, declines, or trends? Summarize any narrative about asset trajectory.")
            .sections(&["item_4"]),
        q("aum_by_strategy", 2, Cat::B, "Break down AUM by strategy or service line if disclosed. Return a JSON object mapping strategy to dollar amount or percentage.")
            .sections(&["item_4", "item_8"])
            .json(),
        q("sma_vs_pooled_split", 2, Cat::B, "What share of assets is in separately managed accounts versus pooled vehicles? Return a JSON object with sma_pct and pooled_pct.")
            .sections(&["item_4"])
            .json(),
        q("wrap_fee_program_aum", 1, Cat::B, "What amount of assets is managed under wrap fee programs? Return dollars.")
            .sections(&["item_4", "item_5"])
            .number(),
        q("sub_advised_aum", 2, Cat::B, "What amount of assets does the firm manage as a sub-adviser for other advisers? Return dollars.")
            .sections(&["item_4"])
            .number(),
        q("non_us_client_aum", 2, Cat::B, "What amount of assets is attributable to non-US clients? Return dollars.")
            .docs(&[SourceDoc::Part1])
            .number(),
        q("account_minimum", 1, Cat::B, "What minimum account size does the firm require to open or maintain an account? Return dollars.")
            .sections(&["item_5", "item_7"])
            .number(),
        q("assets_held_away", 2, Cat::B, "Does the firm advise on assets held away from its custodians (401k plans, outside accounts)?")
            .sections(&["item_4"]),
        q("model_portfolio_assets", 2, Cat::B, "What assets are managed through model portfolios delivered to other platforms? Return dollars.")
            .sections(&["item_4"])
            .number(),
        q("aum_concentration_by_product", 2, Cat::B, "Is AUM concentrated in a single product, strategy, or vehicle? Return a JSON object naming the concentration and its share.")
            .sections(&["item_4", "item_8"])
            .json(),
        q("regulatory_aum_vs_marketed", 2, Cat::B, "Does the firm distinguish regulatory AUM from marketed or advised assets? Note any difference and its size.")
            .sections(&["item_4"]),
        q("aum_definition_notes", 2, Cat::B, "Note any unusual definitions or caveats the firm applies when reporting assets under management.")
            .sections(&["item_4"]),
    ]
}

/// Category C - clients & accounts.
fn clients() -> Vec<Question> {
    vec![
        q("client_types_described", 1, Cat::C, "What types of clients does the firm serve? Return a JSON array of client types.")
            .sections(&["item_7"])
            .json(),
        q("typical_client_profile", 1, Cat::C, "Describe the firm's typical client: wealth level, life stage, institutional character.")
            .sections(&["item_7"]),
        q("client_concentration_hhi", 2, Cat::C, "Estimate a Herfindahl-style concentration index for the client base on a 0-1 scale, where 0 is fully diversified and 1 is a single client. Return a number.")
            .sections(&["item_7"])
            .number(),
        q("top_client_aum_pct", 2, Cat::C, "What percentage of AUM is attributable to the largest client or client family, if determinable? Return a number 0-100.")
            .sections(&["item_7"])
            .number(),
        q("client_retention_rate", 2, Cat::C, "What client retention rate does the firm disclose or imply? Return a number 0-100.")
            .sections(&["item_7", "item_4"])
            .number(),
        q("client_tenure_avg", 2, Cat::C, "What is the average client relationship tenure in years, if disclosed? Return a number.")
            .sections(&["item_7"])
            .number(),
        q("client_geographic_mix", 1, Cat::C, "Describe the geographic distribution of the client base. Return a JSON object mapping region to share if quantified.")
            .sections(&["item_7"])
            .json(),
        q("notable_client_categories", 1, Cat::C, "List notable client categories served (physicians, corporate executives, Taft-Hartley plans, endowments). Return a JSON array.")
            .sections(&["item_7"])
            .json(),
        q("multigenerational_relationships", 2, Cat::C, "Does the firm describe multigenerational client relationships or family-office style service?")
            .sections(&["item_4", "item_7"])
            .boolean(),
        q("referral_sources", 1, Cat::C, "What referral sources does the firm use (solicitors, custodial referral programs, professional networks)?")
            .sections(&["item_14"]),
        q("client_acquisition_channels", 2, Cat::C, "How does the firm acquire new clients?")
            .sections(&["item_4", "item_14"]),
        q("minimum_relationship_size", 1, Cat::C, "What minimum relationship size does the firm state, if any? Return dollars.")
            .sections(&["item_5", "item_7"])
            .number(),
        q("erisa_plan_clients", 1, Cat::C, "Does the firm serve ERISA plan clients?")
            .sections(&["item_7"])
            .boolean(),
        q("foreign_clients", 1, Cat::C, "Does the firm serve clients outside the United States?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        q("client_households_count", 1, Cat::C, "How many client households or relationships does the firm serve, if stated? Return an integer.")
            .sections(&["item_4", "item_7"])
            .integer(),
        q("average_client_age", 2, Cat::C, "What is the average or typical client age, if determinable? Return a number.")
            .sections(&["item_7"])
            .number(),
        q("client_segmentation", 2, Cat::C, "Does the firm segment clients into service tiers? Return a JSON array describing the segments.")
            .sections(&["item_4", "item_7"])
            .json(),
    ]
}

/// Category D - fees & compensation.
fn fees() -> Vec<Question> {
    vec![
        q("fee_schedule", 2, Cat::D, "Extract the asset-based advisory fee schedule. Return a JSON array of tiers, each an object with min_aum (dollars), max_aum (dollars, 0 if unbounded), and annual_rate_pct (annual rate as a percentage, e.g. 1.0 for 1%).")
            .sections(&["item_5"])
            .json(),
        q("fee_negotiability", 1, Cat::D, "Are advisory fees negotiable?")
            .sections(&["item_5"])
            .boolean(),
        q("fee_billing_frequency", 1, Cat::D, "How often are fees billed (monthly, quarterly, annually)?")
            .sections(&["item_5"]),
        q("fee_billing_method", 1, Cat::D, "Are fees billed in advance or in arrears, and how are they calculated (average daily balance, period-end value)?")
            .sections(&["item_5"]),
        q("performance_fees_charged", 1, Cat::D, "Does the firm charge performance-based fees?")
            .sections(&["item_6"])
            .boolean(),
        q("performance_fee_structure", 2, Cat::D, "Describe the performance fee structure: rate, hurdle, high-water mark, eligible clients. Return a JSON object.")
            .sections(&["item_6"])
            .json(),
        q("fixed_fee_arrangements", 1, Cat::D, "Describe any fixed-fee or flat-fee arrangements and their typical ranges.")
            .sections(&["item_5"]),
        q("hourly_fee_rates", 1, Cat::D, "What hourly rates does the firm charge, if any? Return the top rate as a number.")
            .sections(&["item_5"])
            .number(),
        q("wrap_fee_programs", 1, Cat::D, "Does the firm sponsor or participate in wrap fee programs?")
            .sections(&["item_4", "item_5"])
            .boolean(),
        q("third_party_compensation", 2, Cat::D, "Does the firm or its personnel receive 12b-1 fees, trails, or other third-party compensation? Describe.")
            .sections(&["item_5", "item_14"]),
        q("commission_revenue", 2, Cat::D, "Does the firm or affiliated persons earn commission revenue on client transactions? Describe the arrangements.")
            .sections(&["item_5", "item_10"]),
        q("fee_refund_policy", 1, Cat::D, "What is the fee refund policy on account termination?")
            .sections(&["item_5"]),
        q("minimum_annual_fee", 1, Cat::D, "Is there a minimum annual fee? Return dollars.")
            .sections(&["item_5"])
            .number(),
        q("legacy_fee_arrangements", 2, Cat::D, "Does the firm note grandfathered or legacy fee arrangements that differ from the current schedule?")
            .sections(&["item_5"]),
        q("fee_schedule_breakpoints", 1, Cat::D, "Does the published fee schedule include breakpoints at higher asset levels?")
            .sections(&["item_5"])
            .boolean(),
        q("average_fee_realized", 2, Cat::D, "Estimate the average realized advisory fee rate across the client base in percent, using the schedule and any disclosed averages. Return a number.")
            .sections(&["item_5"])
            .number(),
        q("custodian_fee_passthrough", 2, Cat::D, "How are custodian, brokerage, and other third-party fees handled relative to the advisory fee?")
            .sections(&["item_5", "item_15"]),
        q("revenue_sharing_arrangements", 2, Cat::D, "Describe any revenue sharing with custodians, fund sponsors, or platforms.")
            .sections(&["item_14"]),
    ]
}

/// Category E - advisory services & strategy.
fn services() -> Vec<Question> {
    vec![
        q("services_offered", 1, Cat::E, "List the advisory services offered. Return a JSON array.")
            .sections(&["item_4"])
            .json(),
        q("financial_planning_offered", 1, Cat::E, "Does the firm offer financial planning?")
            .sections(&["item_4"])
            .boolean(),
        q("investment_strategies", 1, Cat::E, "List the investment strategies employed. Return a JSON array.")
            .sections(&["item_8"])
            .json(),
        q("methods_of_analysis", 1, Cat::E, "What methods of analysis does the firm use (fundamental, technical, quantitative, third-party research)? Return a JSON array.")
            .sections(&["item_8"])
            .json(),
        q("primary_asset_classes", 1, Cat::E, "List the primary asset classes used in client portfolios. Return a JSON array.")
            .sections(&["item_8"])
            .json(),
        q("use_of_derivatives", 2, Cat::E, "Does the firm use options, futures, or other derivatives in client accounts?")
            .sections(&["item_8"])
            .boolean(),
        q("use_of_leverage", 2, Cat::E, "Does the firm employ leverage or margin in client strategies?")
            .sections(&["item_8"])
            .boolean(),
        q("alternative_investments", 1, Cat::E, "Does the firm allocate to alternative investments (private funds, real estate, commodities)?")
            .sections(&["item_8"])
            .boolean(),
        q("proprietary_products", 2, Cat::E, "Does the firm recommend proprietary products or affiliated funds?")
            .sections(&["item_4", "item_10"])
            .boolean(),
        q("third_party_managers", 1, Cat::E, "Does the firm select or allocate to third-party managers (manager-of-managers)?")
            .sections(&["item_4"])
            .boolean(),
        q("model_portfolios_used", 1, Cat::E, "Does the firm manage accounts against model portfolios?")
            .sections(&["item_4", "item_16"])
            .boolean(),
        q("tamp_relationships", 2, Cat::E, "Does the firm use a turnkey asset management platform (TAMP)? Name it if disclosed.")
            .sections(&["item_4"]),
        q("risk_factors_disclosed", 1, Cat::E, "List the material risk factors the brochure discloses. Return a JSON array of short labels.")
            .sections(&["item_8"])
            .json(),
        q("tailored_services", 1, Cat::E, "Are services tailored to individual client needs, and may clients impose restrictions?")
            .sections(&["item_4"])
            .boolean(),
        q("investment_discretion_level", 1, Cat::E, "Does the firm manage accounts on a discretionary or non-discretionary basis, and under what authority?")
            .sections(&["item_16"]),
        q("tax_management_services", 2, Cat::E, "Does the firm provide tax-aware management or tax planning services?")
            .sections(&["item_4"])
            .boolean(),
        q("esg_investing", 1, Cat::E, "Does the firm offer ESG, sustainable, or values-based investing?")
            .sections(&["item_4", "item_8"])
            .boolean(),
        q("options_strategies", 2, Cat::E, "Describe any options strategies used (covered calls, collars, hedging).")
            .sections(&["item_8"]),
        q("fixed_income_approach", 2, Cat::E, "Describe the firm's fixed income approach (ladders, individual bonds, funds, duration policy).")
            .sections(&["item_8"]),
        q("cash_management", 2, Cat::E, "Does the firm describe cash management or sweep practices?")
            .sections(&["item_8", "item_5"]),
    ]
}

/// Category F - ownership & control. These questions also read the owners
/// schedule blob (see the document assembler allow-list).
fn ownership() -> Vec<Question> {
    vec![
        q("ownership_structure", 2, Cat::F, "Describe the firm's ownership. Return a JSON object with owner_count (integer), owners (array of {name, pct}), and single_owner (boolean).")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .sections(&["item_4"])
            .json(),
        q("employee_ownership", 2, Cat::F, "What percentage of the firm is owned by active employees? Return a number 0-100.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .sections(&["item_4"])
            .number(),
        q("subsidiaries", 2, Cat::F, "List subsidiaries or entities the firm owns or controls. Return a JSON array of names.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .sections(&["item_4", "item_10"])
            .json(),
        q("acquisition_history", 2, Cat::F, "Has the firm acquired other practices or been acquired? Return a JSON array of events with year and counterparty where stated.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .sections(&["item_4"])
            .json(),
        q("parent_company", 1, Cat::F, "Does the firm have a parent or holding company? Name it.")
            .sections(&["item_4", "item_10"]),
        q("private_equity_backing", 2, Cat::F, "Is the firm backed by private equity or an outside institutional investor?")
            .sections(&["item_4", "item_10"])
            .boolean(),
        q("recent_ownership_changes", 2, Cat::F, "Have there been ownership changes in the recent past (sales, buy-ins, recapitalizations)?")
            .sections(&["item_4", "item_2"]),
        q("control_persons", 1, Cat::F, "List the firm's control persons and their roles. Return a JSON array of {name, role}.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .json(),
        q("holding_company_structure", 2, Cat::F, "Is ownership held through intermediate holding companies or trusts?")
            .sections(&["item_4"])
            .boolean(),
        q("foreign_ownership", 2, Cat::F, "Is any portion of the firm foreign-owned?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        q("esop_in_place", 2, Cat::F, "Does the firm maintain an employee stock ownership plan or broad equity participation program?")
            .sections(&["item_4"])
            .boolean(),
        q("principal_owner_roles", 2, Cat::F, "For each principal owner, what operating role do they hold? Return a JSON array of {name, role}.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .sections(&["item_4"])
            .json(),
    ]
}

/// Category G - personnel & key people.
fn personnel() -> Vec<Question> {
    vec![
        q("key_personnel", 1, Cat::G, "List key personnel named in the brochure with titles. Return a JSON array of {name, title}.")
            .sections(&["item_4"])
            .json(),
        q("founder_active", 2, Cat::G, "Is the founder still active in the business?")
            .sections(&["item_4"])
            .boolean(),
        q("portfolio_manager_count", 1, Cat::G, "How many portfolio managers or investment professionals does the firm have? Return an integer.")
            .sections(&["item_4"])
            .integer(),
        q("professional_credentials", 1, Cat::G, "What professional credentials do firm personnel hold (CFA, CFP, CPA)? Return a JSON array.")
            .sections(&["item_4"])
            .json(),
        q("advisor_headcount_trend", 2, Cat::G, "Does the brochure indicate growth or shrinkage in advisory personnel?")
            .sections(&["item_4"]),
        q("advisor_compensation_model", 2, Cat::G, "How are the firm's advisors compensated (salary, revenue share, commissions)?")
            .sections(&["item_5", "item_14"]),
        q("key_person_departures", 2, Cat::G, "Are any recent key-person departures disclosed?")
            .sections(&["item_2", "item_4"]),
        q("team_structure", 2, Cat::G, "Describe the team structure: solo practitioner, ensemble, siloed books, or departmentalized.")
            .sections(&["item_4", "item_13"]),
        q("average_advisor_tenure", 2, Cat::G, "What is the average tenure of the firm's advisors, if stated? Return a number in years.")
            .sections(&["item_4"])
            .number(),
        q("supervised_persons_count", 1, Cat::G, "How many supervised persons does the firm report? Return an integer.")
            .docs(&[SourceDoc::Part1])
            .integer(),
        q("dual_registered_reps", 2, Cat::G, "How many personnel are dually registered as broker-dealer representatives? Return an integer.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .sections(&["item_10"])
            .integer(),
        q("next_gen_leadership", 3, Cat::G, "Assess whether a next generation of leadership is identifiable below the founders: named successors, junior partners, or institutionalized management.")
            .sections(&["item_4"]),
        q("employee_count_trend", 2, Cat::G, "Does total headcount appear to be growing, flat, or shrinking based on the narrative?")
            .sections(&["item_4"]),
        q("advisor_to_client_ratio", 2, Cat::G, "Estimate the ratio of clients per advisor. Return a number.")
            .sections(&["item_4", "item_13"])
            .number(),
    ]
}

/// Category H - compliance & disciplinary.
fn compliance() -> Vec<Question> {
    vec![
        q("disciplinary_events_described", 1, Cat::H, "Does Item 9 describe any disciplinary events? Summarize.")
            .sections(&["item_9"]),
        q("disciplinary_event_details", 2, Cat::H, "Detail each disclosed disciplinary event: date, regulator, allegation, resolution. Return a JSON array.")
            .sections(&["item_9"])
            .json(),
        q("code_of_ethics", 1, Cat::H, "Does the firm maintain a code of ethics under Rule 204A-1?")
            .sections(&["item_11"])
            .boolean(),
        q("compliance_program_described", 2, Cat::H, "Describe the compliance program: policies, testing, responsible parties.")
            .sections(&["item_11"]),
        q("cco_identified", 1, Cat::H, "Is a chief compliance officer identified by name?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        q("regulatory_exams_mentioned", 2, Cat::H, "Are regulatory examinations or their outcomes mentioned?")
            .sections(&["item_9", "item_11"]),
        q("litigation_pending", 2, Cat::H, "Is pending litigation involving the firm or its principals disclosed?")
            .sections(&["item_9"])
            .boolean(),
        q("client_complaints_disclosed", 2, Cat::H, "Are client complaints or arbitration proceedings disclosed?")
            .sections(&["item_9"])
            .boolean(),
        q("insider_trading_controls", 2, Cat::H, "What controls address insider trading and material non-public information?")
            .sections(&["item_11"]),
        q("personal_trading_policy", 1, Cat::H, "Describe the personal trading policy for firm personnel.")
            .sections(&["item_11"]),
        q("political_contributions_policy", 2, Cat::H, "Does the firm describe a pay-to-play or political contributions policy?")
            .sections(&["item_11"]),
        q("privacy_policy_described", 2, Cat::H, "Is a client privacy policy described?")
            .boolean(),
        q("aml_program", 2, Cat::H, "Does the firm describe an anti-money-laundering program?")
            .boolean(),
        q("hedge_clauses", 2, Cat::H, "Do the advisory agreements contain hedge clauses or liability waivers, as described?")
            .sections(&["item_5"])
            .boolean(),
        q("regulatory_risk_narrative", 3, Cat::H, "Synthesize the firm's overall regulatory risk picture from its disclosures: event history, conflicts profile, custody posture, and compliance infrastructure.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
    ]
}

/// Category I - custody, brokerage & trading.
fn custody_trading() -> Vec<Question> {
    vec![
        q("custodians", 1, Cat::I, "List the qualified custodians the firm uses or recommends. Return a JSON array of names.")
            .sections(&["item_15", "item_12"])
            .json(),
        q("custody_arrangements", 1, Cat::I, "Describe the firm's custody arrangements and whether it is deemed to have custody.")
            .sections(&["item_15"]),
        q("surprise_exam_required", 2, Cat::I, "Is the firm subject to an annual surprise examination due to custody?")
            .sections(&["item_15"])
            .boolean(),
        q("custody_fee_debiting", 1, Cat::I, "Does the firm have custody solely due to direct fee debiting?")
            .sections(&["item_15"])
            .boolean(),
        q("brokerage_selection", 1, Cat::I, "How does the firm select or recommend broker-dealers?")
            .sections(&["item_12"]),
        q("soft_dollar_practices", 2, Cat::I, "Describe any soft dollar arrangements and the products or research received.")
            .sections(&["item_12"]),
        q("directed_brokerage", 1, Cat::I, "Does the firm accept directed brokerage instructions from clients?")
            .sections(&["item_12"])
            .boolean(),
        q("trade_aggregation", 1, Cat::I, "Does the firm aggregate client trades, and how are partial fills allocated?")
            .sections(&["item_12"])
            .boolean(),
        q("best_execution_review", 2, Cat::I, "How does the firm review best execution?")
            .sections(&["item_12"]),
        q("trade_error_policy", 2, Cat::I, "What is the trade error correction policy?")
            .sections(&["item_12"]),
        q("cross_trades_disclosed", 1, Cat::I, "Are cross trades between client accounts disclosed?")
            .sections(&["item_8", "item_12"])
            .boolean(),
        q("principal_trading_disclosed", 2, Cat::I, "Does the firm engage in principal transactions with clients, and with what consent procedures?")
            .sections(&["item_8", "item_12"])
            .boolean(),
        q("margin_use", 2, Cat::I, "Does the firm recommend or use margin in client accounts?")
            .sections(&["item_8", "item_12"])
            .boolean(),
        q("account_review_frequency", 1, Cat::I, "How often are client accounts reviewed, and by whom?")
            .sections(&["item_13"]),
        q("account_review_triggers", 2, Cat::I, "What events trigger off-cycle account reviews?")
            .sections(&["item_13"]),
    ]
}

/// Category J - conflicts of interest.
fn conflicts() -> Vec<Question> {
    vec![
        q("conflicts_of_interest", 2, Cat::J, "Catalog the material conflicts of interest the brochure discloses. Return a JSON array of short descriptions.")
            .sections(&["item_10", "item_11", "item_12"])
            .json(),
        q("outside_business_conflicts", 2, Cat::J, "What conflicts arise from personnel's outside business activities?")
            .sections(&["item_10"]),
        q("compensation_conflicts", 2, Cat::J, "What conflicts arise from the firm's compensation arrangements?")
            .sections(&["item_5", "item_14"]),
        q("referral_fee_conflicts", 1, Cat::J, "Does the firm pay or receive referral fees, and how is the conflict disclosed?")
            .sections(&["item_14"]),
        q("proprietary_product_conflicts", 2, Cat::J, "What conflicts arise from recommending proprietary or affiliated products?")
            .sections(&["item_10", "item_11"]),
        q("affiliated_broker_conflicts", 2, Cat::J, "What conflicts arise from an affiliated broker-dealer executing client trades?")
            .sections(&["item_10", "item_12"]),
        q("insurance_sales_conflicts", 1, Cat::J, "Do personnel sell insurance products for commissions?")
            .sections(&["item_10"]),
        q("conflict_mitigation_described", 2, Cat::J, "How does the firm say it mitigates its disclosed conflicts?")
            .sections(&["item_11"]),
        q("fiduciary_language", 1, Cat::J, "Does the client relationship summary affirm a fiduciary standard of conduct?")
            .docs(&[SourceDoc::Part3])
            .boolean(),
        q("dual_hat_roles", 2, Cat::J, "Do principals hold dual roles across affiliated entities that create conflicts?")
            .sections(&["item_10"]),
        q("gifts_entertainment_policy", 2, Cat::J, "Is a gifts and entertainment policy described?")
            .sections(&["item_11"]),
        q("proxy_voting_conflicts", 2, Cat::J, "How are proxy voting conflicts handled, and does the firm vote proxies at all?")
            .sections(&["item_17"]),
        q("performance_fee_conflicts", 1, Cat::J, "What conflicts from side-by-side management of performance-fee and asset-fee accounts are disclosed?")
            .sections(&["item_6"]),
        q("wrap_program_conflicts", 2, Cat::J, "What conflicts arise from sponsoring or participating in wrap fee programs?")
            .sections(&["item_4", "item_5"]),
    ]
}

/// Category K - affiliations & other business.
fn affiliations() -> Vec<Question> {
    vec![
        q("broker_dealer_affiliations", 1, Cat::K, "List affiliated broker-dealers. Return a JSON array of names.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .sections(&["item_10"])
            .json(),
        q("bank_affiliations", 1, Cat::K, "List affiliated banks or thrifts. Return a JSON array of names.")
            .sections(&["item_10"])
            .json(),
        q("insurance_affiliations", 1, Cat::K, "List affiliated insurance companies or agencies. Return a JSON array of names.")
            .sections(&["item_10"])
            .json(),
        q("affiliated_advisers", 2, Cat::K, "List affiliated investment advisers. Return a JSON array of names.")
            .sections(&["item_10"])
            .json(),
        q("affiliated_funds", 2, Cat::K, "List affiliated pooled vehicles or funds the firm advises. Return a JSON array of names.")
            .sections(&["item_10"])
            .json(),
        q("outside_business_activities", 1, Cat::K, "List outside business activities of the firm and its personnel. Return a JSON array.")
            .sections(&["item_10"])
            .json(),
        q("trust_company_affiliation", 1, Cat::K, "Is the firm affiliated with a trust company?")
            .sections(&["item_10"])
            .boolean(),
        q("accounting_firm_affiliation", 1, Cat::K, "Is the firm affiliated with an accounting firm?")
            .sections(&["item_10"])
            .boolean(),
        q("law_firm_affiliation", 1, Cat::K, "Is the firm affiliated with a law firm?")
            .sections(&["item_10"])
            .boolean(),
        q("solicitor_arrangements", 2, Cat::K, "Describe solicitor or promoter arrangements, including compensation.")
            .sections(&["item_14"]),
        q("custodial_affiliations", 2, Cat::K, "Is the firm affiliated with any custodian it recommends?")
            .sections(&["item_10", "item_15"]),
        q("related_person_transactions", 2, Cat::K, "Describe disclosed transactions with related persons.")
            .sections(&["item_11"]),
    ]
}

/// Category L - growth & trajectory. Mostly expert-tier synthesis.
fn growth() -> Vec<Question> {
    vec![
        q("growth_strategy", 3, Cat::L, "Synthesize the firm's growth strategy from all disclosures: organic growth, recruiting, acquisitions, new services, geographies.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("organic_vs_acquisition_growth", 3, Cat::L, "Judge whether the firm's growth appears primarily organic or acquisition-driven, citing the evidence.")
            .sections(&["item_4"]),
        q("new_service_launches", 2, Cat::L, "Are new services, strategies, or programs recently launched?")
            .sections(&["item_2", "item_4"]),
        q("geographic_expansion", 2, Cat::L, "Is geographic expansion described or implied (new offices, new state registrations)?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("recruiting_activity", 2, Cat::L, "Is advisor recruiting or team lift-out activity described?")
            .sections(&["item_4"]),
        q("merger_discussions_disclosed", 2, Cat::L, "Are merger, sale, or strategic transaction discussions disclosed?")
            .sections(&["item_2", "item_4"])
            .boolean(),
        q("capacity_constraints", 3, Cat::L, "Assess whether the firm shows capacity constraints: strategy capacity limits, service model strain, or key-person bottlenecks.")
            .sections(&["item_4", "item_8"]),
        q("market_positioning", 3, Cat::L, "Characterize the firm's market positioning relative to peers: niche, generalist, discount, premium.")
            .sections(&["item_4"]),
        q("competitive_differentiators", 3, Cat::L, "What does the firm present as its competitive differentiators, and how credible are they?")
            .sections(&["item_4"]),
        q("aum_flows_direction", 2, Cat::L, "Do the disclosures indicate net inflows or outflows?")
            .sections(&["item_4"]),
        q("headcount_growth_plans", 2, Cat::L, "Are hiring plans or headcount growth targets described?")
            .sections(&["item_4"]),
    ]
}

/// Category M - operations.
fn operations() -> Vec<Question> {
    vec![
        q("service_providers", 2, Cat::M, "List third-party service providers: sub-advisers, administrators, technology vendors, compliance consultants. Return a JSON array of {name, role}.")
            .json(),
        q("portfolio_management_systems", 2, Cat::M, "What portfolio management or trading systems are named?")
            .sections(&["item_4", "item_13"]),
        q("financial_planning_software", 2, Cat::M, "What financial planning software is named, if any?")
            .sections(&["item_4"]),
        q("reporting_frequency", 1, Cat::M, "How often do clients receive written reports, and from whom?")
            .sections(&["item_13", "item_15"]),
        q("outsourced_cio", 2, Cat::M, "Does the firm use an outsourced CIO or external investment committee?")
            .sections(&["item_4", "item_8"])
            .boolean(),
        q("outsourced_compliance", 2, Cat::M, "Does the firm use an outsourced compliance provider?")
            .sections(&["item_11"])
            .boolean(),
        q("technology_stack", 2, Cat::M, "Summarize the technology stack named across the brochure. Return a JSON array of {vendor, purpose}.")
            .json(),
        q("business_continuity_plan", 2, Cat::M, "Is a business continuity plan described?")
            .boolean(),
        q("cybersecurity_program", 2, Cat::M, "Is a cybersecurity program described?")
            .boolean(),
        q("financial_condition_disclosed", 1, Cat::M, "Does Item 18 disclose any financial condition reasonably likely to impair the firm's ability to meet client commitments?")
            .sections(&["item_18"])
            .boolean(),
        q("client_portal", 1, Cat::M, "Is a client portal or online access described?")
            .sections(&["item_13"])
            .boolean(),
        q("trading_platform", 2, Cat::M, "What trading or rebalancing platform is used, if named?")
            .sections(&["item_12"]),
    ]
}

/// Category N - transaction readiness. The expert-tier heart of the bank.
fn readiness() -> Vec<Question> {
    vec![
        q("succession_plan", 2, Cat::N, "Does the firm disclose a succession plan or continuity arrangement for principal departure, disability, or death?")
            .sections(&["item_4"])
            .boolean(),
        q("non_compete_agreements", 2, Cat::N, "Are non-compete or non-solicit agreements with advisors described or implied?")
            .sections(&["item_4"])
            .boolean(),
        q("key_person_aum_share", 3, Cat::N, "Estimate the share of AUM dependent on a single key person, as a percentage 0-100. Consider named portfolio managers, founder-led relationships, and team structure.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .number(),
        q("equity_incentives", 2, Cat::N, "Does the firm offer equity or synthetic equity incentives to retain key employees?")
            .sections(&["item_4"])
            .boolean(),
        q("acquisition_appetite", 3, Cat::N, "Assess whether the firm presents as a potential acquirer, a potential seller, or neither, citing the evidence.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("integration_readiness", 3, Cat::N, "Assess how easily this firm could be integrated by an acquirer: custodial relationships, technology, fee model standardization, and client contract assignability.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("client_consent_provisions", 3, Cat::N, "What do the disclosures imply about client consent requirements on assignment of advisory contracts?")
            .sections(&["item_4", "item_5"]),
        q("revenue_durability", 3, Cat::N, "Assess the durability of the firm's revenue: recurring fee base, client stickiness, concentration, and fee pressure exposure.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("owner_age_indicators", 3, Cat::N, "Are there indicators of principal age or career stage relevant to transaction timing (founding dates, tenure statements, succession language)?")
            .sections(&["item_4"]),
        q("seller_motivations", 3, Cat::N, "If the firm were a seller, what motivations do the disclosures suggest (succession gap, compliance burden, growth plateau, capital needs)?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("earnout_suitability", 3, Cat::N, "Assess suitability for an earnout structure: revenue predictability, growth trajectory, and key-person risk.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("platform_vs_tuckin", 3, Cat::N, "Classify the firm as a platform acquisition or a tuck-in, with reasoning.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("deal_breakers", 3, Cat::N, "Identify potential deal breakers for an acquirer: disciplinary history, client concentration, unusual fee arrangements, entangled affiliates.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        q("management_depth", 3, Cat::N, "Assess management depth below the principals: named second layer, institutionalized processes, or founder-dependent operations.")
            .sections(&["item_4"]),
        q("recurring_revenue_pct", 3, Cat::N, "Estimate the percentage of revenue that is recurring asset-based fees versus transactional or one-time fees. Return a number 0-100.")
            .sections(&["item_5"])
            .number(),
        q("client_demographics_risk", 3, Cat::N, "Assess client demographic risk: aging client base, decumulation exposure, and generational wealth transfer readiness.")
            .sections(&["item_7"]),
    ]
}

/// Fund-scope questions. The first three are structured bypasses off the
/// private fund record; the rest run against the fund context.
fn fund_questions() -> Vec<Question> {
    vec![
        fund("fund_aum", 1, "Gross and net asset value of the fund.").bypass().json(),
        fund("fund_type", 1, "The fund's type (hedge fund, private equity, venture, real estate, other).")
            .bypass(),
        fund("fund_regulatory_status", 1, "The Investment Company Act exemption the fund relies on.")
            .bypass(),
        fund("fund_strategy", 1, "Describe the fund's investment strategy."),
        fund("fund_fee_structure", 2, "Extract the fund's fee structure. Return a JSON object with management_fee_pct, performance_fee_pct, and any other fees.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .json(),
        fund("fund_management_fee", 1, "The fund's management fee as an annual percentage. Return a number.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .number(),
        fund("fund_performance_fee", 1, "The fund's performance fee or carried interest percentage. Return a number.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .number(),
        fund("fund_hurdle_rate", 2, "The fund's hurdle or preferred return rate, if any. Return a number.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .number(),
        fund("fund_high_water_mark", 2, "Does the fund apply a high-water mark to performance fees?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        fund("fund_lockup_terms", 2, "Describe lockup terms for fund investors.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        fund("fund_redemption_frequency", 1, "How frequently may investors redeem (monthly, quarterly, annually, closed-end)?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        fund("fund_gate_provisions", 2, "Does the fund have gate provisions limiting redemptions?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        fund("fund_side_pockets", 2, "Does the fund use side pockets for illiquid positions?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        fund("fund_leverage_use", 2, "Does the fund employ leverage, and to what degree?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        fund("fund_auditor", 1, "Name the fund's auditor."),
        fund("fund_administrator", 1, "Name the fund's administrator."),
        fund("fund_prime_broker", 1, "Name the fund's prime broker, if any."),
        fund("fund_custodian", 1, "Name the fund's custodian."),
        fund("fund_domicile", 1, "The fund's legal domicile."),
        fund("fund_master_feeder", 2, "Is the fund part of a master-feeder structure?")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .boolean(),
        fund("fund_investor_concentration", 2, "What share of the fund is held by its largest investor, if determinable? Return a number 0-100.")
            .number(),
        fund("fund_related_person_investment", 2, "What percentage of the fund is owned by the adviser and its related persons? Return a number 0-100.")
            .number(),
        fund("fund_valuation_policy", 2, "Describe the fund's valuation policy for hard-to-value assets.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
        fund("fund_key_terms_summary", 3, "Summarize the fund's key commercial terms as JSON: fees, liquidity, leverage, concentration, governance.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2])
            .json(),
        fund("fund_risk_profile", 2, "Characterize the fund's risk profile from strategy, leverage, and liquidity terms.")
            .docs(&[SourceDoc::Part1, SourceDoc::Part2]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_count_matches() {
        assert_eq!(build().len(), QUESTION_COUNT);
    }

    #[test]
    fn test_fund_bypass_questions_exist() {
        let bank = build();
        for key in ["fund_aum", "fund_type", "fund_regulatory_status"] {
            let q = bank.iter().find(|q| q.key == key).expect(key);
            assert!(q.structured_bypass);
            assert_eq!(q.scope, Scope::Fund);
        }
    }

    #[test]
    fn test_tier_distribution_is_sane() {
        let bank = build();
        let t1 = bank.iter().filter(|q| q.tier == 1).count();
        let t3 = bank.iter().filter(|q| q.tier == 3).count();
        // The cheap tier carries the bulk of the bank; the expert tier is rare.
        assert!(t1 > bank.len() / 3);
        assert!(t3 < bank.len() / 5);
    }
}
