//! Answer merging across tiers.
//!
//! The rule is deterministic: a higher tier always wins; within a tier the
//! higher confidence wins; exact ties keep the incumbent. Never-seen question
//! keys append in arrival order.

use std::collections::HashMap;

use crate::models::Answer;

/// True when `incoming` should replace `existing` for the same question key.
fn supersedes(incoming: &Answer, existing: &Answer) -> bool {
    incoming.tier > existing.tier
        || (incoming.tier == existing.tier && incoming.confidence > existing.confidence)
}

/// Merge `incoming` answers onto `answers` in place.
pub fn merge_answers(answers: &mut Vec<Answer>, incoming: Vec<Answer>) {
    let mut index: HashMap<String, usize> = answers
        .iter()
        .enumerate()
        .map(|(i, a)| (a.question_key.clone(), i))
        .collect();

    for answer in incoming {
        match index.get(&answer.question_key) {
            Some(&i) => {
                if supersedes(&answer, &answers[i]) {
                    answers[i] = answer;
                }
            },
            None => {
                index.insert(answer.question_key.clone(), answers.len());
                answers.push(answer);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerValue;

    fn answer(key: &str, tier: u8, confidence: f64) -> Answer {
        Answer {
            tier,
            confidence,
            ..Answer::new(key, AnswerValue::Integer(tier as i64))
        }
    }

    #[test]
    fn test_higher_tier_wins_regardless_of_confidence() {
        let mut base = vec![answer("k1", 1, 0.3)];
        merge_answers(&mut base, vec![answer("k1", 2, 0.2)]);
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].tier, 2);
        assert_eq!(base[0].confidence, 0.2);
    }

    #[test]
    fn test_same_tier_higher_confidence_wins() {
        let mut base = vec![answer("k1", 2, 0.2)];
        merge_answers(&mut base, vec![answer("k1", 2, 0.9)]);
        assert_eq!(base[0].confidence, 0.9);
    }

    #[test]
    fn test_exact_tie_keeps_incumbent() {
        let mut base = vec![answer("k1", 2, 0.5)];
        base[0].model = "incumbent".to_string();
        let mut challenger = answer("k1", 2, 0.5);
        challenger.model = "challenger".to_string();
        merge_answers(&mut base, vec![challenger]);
        assert_eq!(base[0].model, "incumbent");
    }

    #[test]
    fn test_lower_tier_never_replaces() {
        let mut base = vec![answer("k1", 3, 0.1)];
        merge_answers(&mut base, vec![answer("k1", 1, 1.0)]);
        assert_eq!(base[0].tier, 3);
    }

    #[test]
    fn test_new_keys_append_in_arrival_order() {
        let mut base = vec![answer("a", 1, 0.5)];
        merge_answers(&mut base, vec![answer("b", 1, 0.5), answer("c", 1, 0.5)]);
        let keys: Vec<&str> = base.iter().map(|a| a.question_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = vec![answer("a", 1, 0.5), answer("b", 2, 0.4)];
        let incoming = vec![answer("a", 2, 0.3), answer("c", 1, 0.8)];

        let mut once = base.clone();
        merge_answers(&mut once, incoming.clone());
        let mut twice = once.clone();
        merge_answers(&mut twice, incoming);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.question_key, b.question_key);
            assert_eq!(a.tier, b.tier);
            assert_eq!(a.confidence, b.confidence);
        }
    }

    #[test]
    fn test_escalation_sequence() {
        // T1 low-confidence answer, then an escalated T2 answer with even
        // lower confidence, then a better T2 answer.
        let mut merged = vec![];
        merge_answers(&mut merged, vec![answer("k1", 1, 0.3)]);
        merge_answers(&mut merged, vec![answer("k1", 2, 0.2)]);
        assert_eq!((merged[0].tier, merged[0].confidence), (2, 0.2));
        merge_answers(&mut merged, vec![answer("k1", 2, 0.9)]);
        assert_eq!((merged[0].tier, merged[0].confidence), (2, 0.9));
    }
}
