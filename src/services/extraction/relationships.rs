//! Relationship rows derived from the merged answer set.

use std::collections::HashSet;

use crate::models::{Answer, AnswerValue};
use crate::store::normalize::normalize_entity_name;
use crate::store::{RelationshipRow, RelationshipRows};

/// Pull custodian, broker-dealer, and service-provider relationships out of
/// the canonical advisor answers. Rows deduplicate on normalized name (plus
/// relationship type for service providers).
pub fn relationships_from_answers(crd_number: i64, answers: &[Answer]) -> RelationshipRows {
    let mut rows = RelationshipRows::default();

    if let Some(answer) = find(answers, "custodians") {
        rows.custodians = entity_rows(crd_number, &answer.value, None);
    }
    if let Some(answer) = find(answers, "broker_dealer_affiliations") {
        rows.bd_affiliations = entity_rows(crd_number, &answer.value, None);
    }
    if let Some(answer) = find(answers, "service_providers") {
        rows.service_providers = entity_rows(crd_number, &answer.value, Some("role"));
    }

    rows
}

fn find<'a>(answers: &'a [Answer], key: &str) -> Option<&'a Answer> {
    answers.iter().find(|a| a.question_key == key && !a.value.is_null())
}

/// Flatten a list-valued answer into deduplicated relationship rows. List
/// entries may be bare strings or objects carrying `name` and, optionally,
/// the field named by `type_field`.
fn entity_rows(
    crd_number: i64,
    value: &AnswerValue,
    type_field: Option<&str>,
) -> Vec<RelationshipRow> {
    let AnswerValue::List(entries) = value else { return vec![] };

    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut rows = Vec::new();

    for entry in entries {
        let (name, relationship_type) = match entry {
            AnswerValue::Text(name) => (name.clone(), None),
            AnswerValue::Map(map) => {
                let Some(name) = map.get("name").and_then(|v| v.as_str()) else { continue };
                let rel = type_field
                    .and_then(|f| map.get(f))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                (name.to_string(), rel)
            },
            _ => continue,
        };

        let normalized = normalize_entity_name(&name);
        if normalized.is_empty() {
            continue;
        }
        if !seen.insert((normalized.clone(), relationship_type.clone())) {
            continue;
        }
        rows.push(RelationshipRow {
            crd_number,
            entity_name: name,
            normalized_name: normalized,
            relationship_type,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_answer(key: &str, value: serde_json::Value) -> Answer {
        Answer::new(key, AnswerValue::from_json(value))
    }

    #[test]
    fn test_custodians_dedupe_on_normalized_name() {
        let answers = vec![list_answer(
            "custodians",
            serde_json::json!(["Charles Schwab & Co., Inc.", "Charles Schwab", "Fidelity"]),
        )];
        let rows = relationships_from_answers(1, &answers);
        assert_eq!(rows.custodians.len(), 2);
        assert_eq!(rows.custodians[0].normalized_name, "charles schwab");
        assert_eq!(rows.custodians[0].entity_name, "Charles Schwab & Co., Inc.");
    }

    #[test]
    fn test_service_providers_carry_role() {
        let answers = vec![list_answer(
            "service_providers",
            serde_json::json!([
                {"name": "Orion Advisor Tech", "role": "portfolio accounting"},
                {"name": "Orion Advisor Tech", "role": "portfolio accounting"},
                {"name": "Orion Advisor Tech", "role": "billing"}
            ]),
        )];
        let rows = relationships_from_answers(1, &answers);
        assert_eq!(rows.service_providers.len(), 2);
        assert_eq!(rows.service_providers[0].relationship_type.as_deref(), Some("portfolio accounting"));
    }

    #[test]
    fn test_null_and_missing_answers_yield_empty() {
        let answers = vec![Answer::new("custodians", AnswerValue::Null)];
        assert!(relationships_from_answers(1, &answers).is_empty());
        assert!(relationships_from_answers(1, &[]).is_empty());
    }
}
