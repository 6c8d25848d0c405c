//! Question bank: the fixed registry of due-diligence questions and the
//! routing metadata that drives the tiered pipeline.
//!
//! The bank is compile-time static. Accessors hand out `&'static` borrows of
//! one lazily-built snapshot; nothing mutates it after construction.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::models::Scope;

mod bank;

// ============================================================================
// Routing metadata
// ============================================================================

/// Advisory question category. Fund-scope questions carry no category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Firm profile & registration
    A,
    /// Assets under management
    B,
    /// Clients & accounts
    C,
    /// Fees & compensation
    D,
    /// Advisory services & strategy
    E,
    /// Ownership & control
    F,
    /// Personnel & key people
    G,
    /// Compliance & disciplinary
    H,
    /// Custody, brokerage & trading
    I,
    /// Conflicts of interest
    J,
    /// Affiliations & other business
    K,
    /// Growth & trajectory
    L,
    /// Operations
    M,
    /// Transaction readiness
    N,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
            Self::H => "H",
            Self::I => "I",
            Self::J => "J",
            Self::K => "K",
            Self::L => "L",
            Self::M => "M",
            Self::N => "N",
        }
    }
}

/// Which filing documents feed a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceDoc {
    Part1,
    Part2,
    Part3,
}

impl SourceDoc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Part1 => "part1",
            Self::Part2 => "part2",
            Self::Part3 => "part3",
        }
    }
}

/// Expected shape of the answer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Number,
    Integer,
    Boolean,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

// ============================================================================
// Question
// ============================================================================

/// One registered question.
#[derive(Debug, Clone)]
pub struct Question {
    /// Unique snake_case identifier. Doubles as the persistence key.
    pub key: &'static str,
    /// Prompt text sent to the model (ignored for bypass questions).
    pub text: &'static str,
    /// Default tier 1..=3. Escalated answers may carry a higher tier.
    pub tier: u8,
    pub category: Option<Category>,
    pub scope: Scope,
    pub source_docs: Vec<SourceDoc>,
    /// Ordered brochure item keys like `item_5`. Empty = whole document.
    pub source_sections: Vec<&'static str>,
    /// Answerable directly from Part 1 structured fields, no model call.
    pub structured_bypass: bool,
    pub output_format: OutputFormat,
}

impl Question {
    pub fn primary_source_doc(&self) -> &'static str {
        self.source_docs.first().map(|d| d.as_str()).unwrap_or("")
    }

    pub fn primary_source_section(&self) -> &'static str {
        self.source_sections.first().copied().unwrap_or("")
    }
}

// ============================================================================
// Accessors
// ============================================================================

static BANK: Lazy<Vec<Question>> = Lazy::new(bank::build);

static BANK_BY_KEY: Lazy<HashMap<&'static str, &'static Question>> =
    Lazy::new(|| BANK.iter().map(|q| (q.key, q)).collect());

/// Every registered question, in declaration order.
pub fn all_questions() -> &'static [Question] {
    &BANK
}

pub fn questions_by_scope(scope: Scope) -> Vec<&'static Question> {
    BANK.iter().filter(|q| q.scope == scope).collect()
}

pub fn questions_by_tier(tier: u8) -> Vec<&'static Question> {
    BANK.iter().filter(|q| q.tier == tier).collect()
}

pub fn structured_bypass_questions() -> Vec<&'static Question> {
    BANK.iter().filter(|q| q.structured_bypass).collect()
}

/// Key -> question lookup over the full bank.
pub fn question_map() -> &'static HashMap<&'static str, &'static Question> {
    &BANK_BY_KEY
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bank_cardinality_is_stable() {
        assert_eq!(all_questions().len(), bank::QUESTION_COUNT);
    }

    #[test]
    fn test_keys_are_unique() {
        let mut seen = HashSet::new();
        for q in all_questions() {
            assert!(seen.insert(q.key), "duplicate question key: {}", q.key);
        }
    }

    #[test]
    fn test_tiers_and_scopes_are_valid() {
        for q in all_questions() {
            assert!((1..=3).contains(&q.tier), "{} has tier {}", q.key, q.tier);
            assert!(!q.source_docs.is_empty(), "{} names no source docs", q.key);
            match q.scope {
                Scope::Advisor => {
                    assert!(q.category.is_some(), "{} is advisor-scope without category", q.key)
                },
                Scope::Fund => assert!(q.category.is_none(), "{} is fund-scope with category", q.key),
            }
        }
    }

    #[test]
    fn test_every_bypass_question_reads_part1() {
        for q in structured_bypass_questions() {
            assert!(
                q.source_docs.contains(&SourceDoc::Part1),
                "bypass question {} does not name part1",
                q.key
            );
        }
    }

    #[test]
    fn test_section_keys_are_well_formed() {
        for q in all_questions() {
            for section in &q.source_sections {
                let item = section
                    .strip_prefix("item_")
                    .and_then(|n| n.parse::<u32>().ok())
                    .unwrap_or(0);
                assert!((1..=18).contains(&item), "{} routes to bad section {}", q.key, section);
            }
        }
    }

    #[test]
    fn test_question_map_covers_bank() {
        let map = question_map();
        assert_eq!(map.len(), all_questions().len());
        assert!(map.contains_key("fee_schedule"));
        assert!(map.contains_key("current_aum"));
    }
}
