//! Per-tier system prompts.
//!
//! The static core stays identical across an advisor's requests within one
//! tier so the provider's prompt cache can reuse it; only the firm identity
//! block varies per advisor.

/// The static foundation shared by every tier.
const PROMPT_CORE: &str = r#"You are an M&A due-diligence analyst extracting facts from SEC Form ADV filings of registered investment advisers.

You will be given a question and excerpts from the adviser's filings (structured Part 1 fields rendered as text, Part 2 brochure sections, or the Part 3 relationship summary).

Rules:
1. Answer ONLY from the provided filing text. Never use outside knowledge about the firm.
2. If the filings do not answer the question, return a null value with low confidence. Do not guess.
3. Respond with a single JSON object and nothing else:
   {"value": <answer>, "confidence": <0.0-1.0>, "reasoning": "<one or two sentences citing the filing language>"}
4. Match the requested output shape: numbers as bare numbers (no currency symbols or commas), booleans as true/false, lists and objects as JSON.
5. Confidence reflects how directly the filing supports the answer: 0.9+ for verbatim disclosure, 0.5-0.8 for reasonable inference, below 0.4 when the text is only suggestive."#;

const TIER1_FOCUS: &str = "Extract the single stated fact. Prefer verbatim figures and names over interpretation.";

const TIER2_FOCUS: &str = "The question may require reading across sections and normalizing inconsistent disclosure. Reconcile conflicting statements and say which section you relied on.";

const TIER3_FOCUS: &str = "The question requires expert judgment across the whole filing. Weigh the evidence, note what is absent as well as what is disclosed, and be explicit about uncertainty in the reasoning.";

fn tier_focus(tier: u8) -> &'static str {
    match tier {
        1 => TIER1_FOCUS,
        2 => TIER2_FOCUS,
        _ => TIER3_FOCUS,
    }
}

/// System prompt for advisor-scope extraction at the given tier.
pub fn system_prompt(tier: u8, firm_name: &str, crd_number: i64) -> String {
    format!(
        "{}\n\n{}\n\nFirm under review: {} (CRD {}).",
        PROMPT_CORE,
        tier_focus(tier),
        firm_name,
        crd_number
    )
}

/// System prompt for fund-scope extraction: the advisor prompt plus the fund
/// record context.
pub fn fund_system_prompt(
    tier: u8,
    firm_name: &str,
    crd_number: i64,
    fund_context: &str,
) -> String {
    format!(
        "{}\n\nThe questions concern one private fund advised by this firm. Fund context:\n\n{}",
        system_prompt(tier, firm_name, crd_number),
        fund_context
    )
}
