//! Answers, extraction runs, and the dynamic answer payload.
//!
//! `AnswerValue` is a tagged union rather than a stringly-typed blob; its
//! JSON encoding is the canonical wire form for persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Scope
// ============================================================================

/// Whether a question (and its answer) targets the advisor or one of its
/// private funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Advisor,
    Fund,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advisor => "advisor",
            Self::Fund => "fund",
        }
    }
}

// ============================================================================
// Answer Value
// ============================================================================

/// Dynamically-typed answer payload: scalar, list, or nested mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<AnswerValue>),
    Map(BTreeMap<String, AnswerValue>),
}

impl AnswerValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness: booleans as-is; strings "y"/"yes"/"true" (case-insensitive);
    /// non-zero numbers; anything else is false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "true")
            },
            Self::Integer(n) => *n != 0,
            Self::Number(n) => *n != 0.0,
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Number(n) => Some(*n as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Number(n.as_f64().unwrap_or(0.0))
                }
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            },
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            },
        }
    }
}

impl From<serde_json::Value> for AnswerValue {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

// ============================================================================
// Answer
// ============================================================================

/// One extracted answer. Tier 0 means structured bypass (no model call).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub crd_number: i64,
    pub fund_id: Option<String>,
    pub question_key: String,
    pub value: AnswerValue,
    /// Confidence in [0, 1]. Bypass answers carry 1.0 (or 0.0 on missing data).
    pub confidence: f64,
    pub tier: u8,
    pub reasoning: String,
    pub source_doc: String,
    pub source_section: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub run_id: String,
    pub extracted_at: DateTime<Utc>,
}

impl Answer {
    /// Skeleton answer with orchestrator-assigned fields left blank.
    pub fn new(question_key: &str, value: AnswerValue) -> Self {
        Self {
            crd_number: 0,
            fund_id: None,
            question_key: question_key.to_string(),
            value,
            confidence: 0.0,
            tier: 0,
            reasoning: String::new(),
            source_doc: String::new(),
            source_section: String::new(),
            model: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            run_id: String::new(),
            extracted_at: Utc::now(),
        }
    }
}

// ============================================================================
// Extraction Run
// ============================================================================

/// Run status lifecycle: running -> complete | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Complete,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn parse_status(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "complete" => Self::Complete,
            _ => Self::Failed,
        }
    }
}

/// One extraction run over a single advisor (or a single fund).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRun {
    pub id: String,
    pub crd_number: i64,
    pub scope: Scope,
    pub fund_id: Option<String>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tier_completed: u8,
    pub total_questions: i64,
    pub answered: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub error_message: Option<String>,
}

impl ExtractionRun {
    pub fn start(crd_number: i64, scope: Scope, fund_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            crd_number,
            scope,
            fund_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            tier_completed: 0,
            total_questions: 0,
            answered: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_value_json_round_trip() {
        let value = AnswerValue::from_json(serde_json::json!({
            "tiers": [{"min_aum": 0, "max_aum": 250_000_000u64, "annual_rate_pct": 1.0}],
            "notes": null,
        }));
        let encoded = serde_json::to_value(&value).expect("serialize");
        assert_eq!(AnswerValue::from_json(encoded), value);
    }

    #[test]
    fn test_truthiness() {
        assert!(AnswerValue::Bool(true).is_truthy());
        assert!(AnswerValue::Text("Y".into()).is_truthy());
        assert!(AnswerValue::Text("yes".into()).is_truthy());
        assert!(AnswerValue::Text("TRUE".into()).is_truthy());
        assert!(AnswerValue::Integer(2).is_truthy());
        assert!(AnswerValue::Number(0.5).is_truthy());

        assert!(!AnswerValue::Bool(false).is_truthy());
        assert!(!AnswerValue::Text("n".into()).is_truthy());
        assert!(!AnswerValue::Integer(0).is_truthy());
        assert!(!AnswerValue::Null.is_truthy());
        assert!(!AnswerValue::List(vec![]).is_truthy());
    }

    #[test]
    fn test_integer_preferred_over_number() {
        let value = AnswerValue::from_json(serde_json::json!(42));
        assert_eq!(value, AnswerValue::Integer(42));
        let value = AnswerValue::from_json(serde_json::json!(42.5));
        assert_eq!(value, AnswerValue::Number(42.5));
    }

    #[test]
    fn test_run_status_round_trip() {
        for status in [RunStatus::Running, RunStatus::Complete, RunStatus::Failed] {
            assert_eq!(RunStatus::parse_status(status.as_str()), status);
        }
        assert_eq!(RunStatus::parse_status("garbage"), RunStatus::Failed);
    }
}
