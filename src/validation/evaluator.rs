//! Policy pass/fail decision
//!
//! A policy passes only when every requirement is met. A query with no
//! reported score counts as 0.

use crate::domain::ScoreRequirement;
use std::collections::HashMap;

/// Stateless evaluator of scores against policy requirements
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// True iff every requirement has `actual[query] >= required`
    pub fn evaluate(&self, actual: &HashMap<String, i64>, required: &[ScoreRequirement]) -> bool {
        required
            .iter()
            .all(|r| Self::actual_score(actual, &r.query_id) >= r.required_score)
    }

    /// Requirements that were not met, in declaration order
    pub fn failing_criteria<'a>(
        &self,
        actual: &HashMap<String, i64>,
        required: &'a [ScoreRequirement],
    ) -> Vec<&'a ScoreRequirement> {
        required
            .iter()
            .filter(|r| Self::actual_score(actual, &r.query_id) < r.required_score)
            .collect()
    }

    fn actual_score(actual: &HashMap<String, i64>, query_id: &str) -> i64 {
        actual.get(query_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn actual(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(q, s)| (q.to_string(), *s)).collect()
    }

    #[test]
    fn test_all_requirements_met() {
        let required = vec![ScoreRequirement::new("q1", 80), ScoreRequirement::new("q2", 50)];
        let scores = actual(&[("q1", 80), ("q2", 99)]);
        assert!(PolicyEvaluator::new().evaluate(&scores, &required));
    }

    #[test]
    fn test_one_requirement_missed() {
        let required = vec![ScoreRequirement::new("q1", 80), ScoreRequirement::new("q2", 50)];
        let scores = actual(&[("q1", 79), ("q2", 99)]);
        let evaluator = PolicyEvaluator::new();

        assert!(!evaluator.evaluate(&scores, &required));
        let failing = evaluator.failing_criteria(&scores, &required);
        assert_eq!(failing.len(), 1);
        assert_eq!(failing[0].query_id, "q1");
    }

    #[test]
    fn test_missing_score_counts_as_zero() {
        let evaluator = PolicyEvaluator::new();
        let scores = actual(&[("other", 100)]);

        assert!(!evaluator.evaluate(&scores, &[ScoreRequirement::new("q1", 1)]));
        assert!(evaluator.evaluate(&scores, &[ScoreRequirement::new("q1", 0)]));
    }

    #[test]
    fn test_empty_requirements_pass() {
        assert!(PolicyEvaluator::new().evaluate(&HashMap::new(), &[]));
    }

    #[quickcheck]
    fn prop_evaluate_matches_definition(pairs: Vec<(u8, i64, Option<i64>)>) -> bool {
        // query ids from a small alphabet so requirements and scores overlap
        let mut required = Vec::new();
        let mut scores = HashMap::new();
        for (key, req, act) in pairs {
            let query_id = format!("q{}", key % 8);
            required.push(ScoreRequirement::new(query_id.clone(), req));
            if let Some(a) = act {
                scores.insert(query_id, a);
            }
        }

        let expected = required
            .iter()
            .all(|r| *scores.get(&r.query_id).unwrap_or(&0) >= r.required_score);
        PolicyEvaluator::new().evaluate(&scores, &required) == expected
    }

    #[quickcheck]
    fn prop_failing_criteria_empty_iff_pass(pairs: Vec<(u8, i64, i64)>) -> bool {
        let required: Vec<_> = pairs
            .iter()
            .map(|(k, r, _)| ScoreRequirement::new(format!("q{}", k % 4), *r))
            .collect();
        let scores: HashMap<String, i64> = pairs
            .iter()
            .map(|(k, _, a)| (format!("q{}", k % 4), *a))
            .collect();

        let evaluator = PolicyEvaluator::new();
        evaluator.evaluate(&scores, &required) == evaluator.failing_criteria(&scores, &required).is_empty()
    }
}
