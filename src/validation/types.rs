//! Validation record type definitions

use crate::domain::{MAX_SCORE, MIN_SCORE};
use crate::errors::{PipelineError, Result};
use crate::validation::state::ValidationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Score reported by one validation query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryScore {
    pub query_id: String,
    pub score: i64,
}

impl QueryScore {
    pub fn new(query_id: impl Into<String>, score: i64) -> Self {
        Self {
            query_id: query_id.into(),
            score,
        }
    }
}

/// Collapse ordered scores into a lookup map
pub fn score_map(scores: &[QueryScore]) -> HashMap<String, i64> {
    scores
        .iter()
        .map(|s| (s.query_id.clone(), s.score))
        .collect()
}

/// Persisted record of one validation run
///
/// The record is the single checkpoint of a run: it is saved after every
/// status change and is immutable once its status is terminal. Reported
/// scores are range-checked here, before they can be persisted; nowhere
/// else in the pipeline enforces the [0, 100] contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPolicyValidation {
    pub validation_id: String,
    pub input_document_id: String,
    pub policy_id: String,
    pub status: ValidationStatus,

    /// Initial scores in policy declaration order
    pub validation_scores: Vec<QueryScore>,

    pub transformed_document_id: Option<String>,

    /// Scores of the transformed document, in declaration order
    pub post_transform_validation_scores: Option<Vec<QueryScore>>,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub passed: Option<bool>,
}

impl DocumentPolicyValidation {
    /// Create a pending record
    pub fn new(
        validation_id: impl Into<String>,
        input_document_id: impl Into<String>,
        policy_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            validation_id: validation_id.into(),
            input_document_id: input_document_id.into(),
            policy_id: policy_id.into(),
            status: ValidationStatus::Pending,
            validation_scores: Vec::new(),
            transformed_document_id: None,
            post_transform_validation_scores: None,
            started_at,
            completed_at: None,
            error_message: None,
            passed: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, enforcing the state machine
    ///
    /// The status table allows IN_PROGRESS → PASSED | FAILED for
    /// re-validation; the record additionally requires that a transformed
    /// document exists, so the first pass always goes through
    /// VALIDATION_COMPLETE.
    pub fn transition_to(&mut self, next: ValidationStatus) -> Result<()> {
        let revalidation_outcome = self.status == ValidationStatus::InProgress
            && matches!(next, ValidationStatus::Passed | ValidationStatus::Failed);
        if revalidation_outcome && self.transformed_document_id.is_none() {
            return Err(PipelineError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        self.status = self.status.transition(next)?;
        Ok(())
    }

    /// Append an initial validation score
    pub fn add_validation_score(&mut self, score: QueryScore) -> Result<()> {
        self.ensure_mutable()?;
        check_score_range(&score)?;
        self.validation_scores.push(score);
        Ok(())
    }

    /// Append a post-transformation score
    pub fn add_post_transform_score(&mut self, score: QueryScore) -> Result<()> {
        self.ensure_mutable()?;
        check_score_range(&score)?;
        self.post_transform_validation_scores
            .get_or_insert_with(Vec::new)
            .push(score);
        Ok(())
    }

    pub fn set_transformed_document(&mut self, document_id: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.transformed_document_id = Some(document_id.into());
        Ok(())
    }

    /// Finish the run with a pass/fail decision
    pub fn complete(&mut self, passed: bool, at: DateTime<Utc>) -> Result<()> {
        let next = if passed {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Failed
        };
        self.transition_to(next)?;
        self.passed = Some(passed);
        self.completed_at = Some(at);
        Ok(())
    }

    /// Abort the run, keeping whatever scores were already captured
    pub fn fail(&mut self, message: impl Into<String>, at: DateTime<Utc>) -> Result<()> {
        self.transition_to(ValidationStatus::Error)?;
        self.error_message = Some(message.into());
        self.passed = Some(false);
        self.completed_at = Some(at);
        Ok(())
    }

    /// Scores that decided the outcome: post-transform if present, else initial
    pub fn final_scores(&self) -> &[QueryScore] {
        self.post_transform_validation_scores
            .as_deref()
            .unwrap_or(&self.validation_scores)
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_terminal() {
            return Err(PipelineError::InvalidInput(format!(
                "validation {} is {} and can no longer change",
                self.validation_id, self.status
            )));
        }
        Ok(())
    }
}

fn check_score_range(score: &QueryScore) -> Result<()> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score.score) {
        return Err(PipelineError::InvalidScore {
            query_id: score.query_id.clone(),
            score: score.score,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DocumentPolicyValidation {
        DocumentPolicyValidation::new("val-1", "doc-1", "pol-1", Utc::now())
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = record();
        assert_eq!(record.status, ValidationStatus::Pending);
        assert!(record.validation_scores.is_empty());
        assert!(record.passed.is_none());
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let mut record = record();
        record.transition_to(ValidationStatus::InProgress).unwrap();

        let err = record.add_validation_score(QueryScore::new("q1", 101)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidScore { score: 101, .. }));

        let err = record.add_post_transform_score(QueryScore::new("q1", -5)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidScore { score: -5, .. }));

        assert!(record.validation_scores.is_empty());
        assert!(record.post_transform_validation_scores.is_none());
    }

    #[test]
    fn test_boundary_scores_accepted() {
        let mut record = record();
        record.add_validation_score(QueryScore::new("q1", 0)).unwrap();
        record.add_validation_score(QueryScore::new("q2", 100)).unwrap();
        assert_eq!(record.validation_scores.len(), 2);
    }

    #[test]
    fn test_complete_sets_outcome() {
        let mut record = record();
        record.transition_to(ValidationStatus::InProgress).unwrap();
        record.transition_to(ValidationStatus::ValidationComplete).unwrap();

        let at = Utc::now();
        record.complete(true, at).unwrap();
        assert_eq!(record.status, ValidationStatus::Passed);
        assert_eq!(record.passed, Some(true));
        assert_eq!(record.completed_at, Some(at));
    }

    #[test]
    fn test_first_pass_cannot_skip_validation_complete() {
        let mut record = record();
        record.transition_to(ValidationStatus::InProgress).unwrap();

        let err = record.complete(true, Utc::now()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
        assert_eq!(record.status, ValidationStatus::InProgress);
        assert!(record.passed.is_none());
    }

    #[test]
    fn test_revalidation_completes_from_in_progress() {
        let mut record = record();
        for next in [
            ValidationStatus::InProgress,
            ValidationStatus::ValidationComplete,
            ValidationStatus::TransformationRequired,
            ValidationStatus::TransformationInProgress,
        ] {
            record.transition_to(next).unwrap();
        }
        record.set_transformed_document("doc-2").unwrap();
        record.transition_to(ValidationStatus::TransformationComplete).unwrap();
        record.transition_to(ValidationStatus::InProgress).unwrap();

        record.complete(false, Utc::now()).unwrap();
        assert_eq!(record.status, ValidationStatus::Failed);
    }

    #[test]
    fn test_terminal_record_is_immutable() {
        let mut record = record();
        record.fail("boom", Utc::now()).unwrap();

        assert!(record.add_validation_score(QueryScore::new("q1", 50)).is_err());
        assert!(record.set_transformed_document("doc-2").is_err());
        assert!(record.fail("again", Utc::now()).is_err());
        assert_eq!(record.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_fail_keeps_partial_scores() {
        let mut record = record();
        record.transition_to(ValidationStatus::InProgress).unwrap();
        record.add_validation_score(QueryScore::new("q1", 70)).unwrap();
        record.fail("service down", Utc::now()).unwrap();

        assert_eq!(record.status, ValidationStatus::Error);
        assert_eq!(record.passed, Some(false));
        assert_eq!(record.validation_scores, vec![QueryScore::new("q1", 70)]);
    }

    #[test]
    fn test_final_scores_prefers_post_transform() {
        let mut record = record();
        record.add_validation_score(QueryScore::new("q1", 40)).unwrap();
        assert_eq!(record.final_scores()[0].score, 40);

        record.add_post_transform_score(QueryScore::new("q1", 90)).unwrap();
        assert_eq!(record.final_scores()[0].score, 90);
    }

    #[test]
    fn test_record_serialization() {
        let mut record = record();
        record.add_validation_score(QueryScore::new("q1", 85)).unwrap();

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"PENDING\""));

        let decoded: DocumentPolicyValidation = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }
}
