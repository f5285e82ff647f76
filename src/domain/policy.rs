//! Validation policies

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lowest valid score
pub const MIN_SCORE: i64 = 0;

/// Highest valid score
pub const MAX_SCORE: i64 = 100;

/// Minimum score a query must reach for the policy to pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequirement {
    pub query_id: String,
    pub required_score: i64,
}

impl ScoreRequirement {
    pub fn new(query_id: impl Into<String>, required_score: i64) -> Self {
        Self {
            query_id: query_id.into(),
            required_score,
        }
    }
}

/// A named set of score requirements plus optional transformations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub title: String,

    /// Requirements in declaration order
    pub validation_scores: Vec<ScoreRequirement>,

    /// Transformation query ids in application order
    #[serde(default)]
    pub transformation_queries: Vec<String>,
}

impl Policy {
    /// Create a policy, rejecting definitions that break its invariants
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        validation_scores: Vec<ScoreRequirement>,
        transformation_queries: Vec<String>,
    ) -> Result<Self> {
        let policy = Self {
            id: id.into(),
            title: title.into(),
            validation_scores,
            transformation_queries,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check the policy invariants
    ///
    /// - id non-empty
    /// - no query listed twice among the requirements
    /// - every required score within [0, 100]
    /// - no empty transformation query id
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PipelineError::InvalidPolicy("policy id is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for requirement in &self.validation_scores {
            if !seen.insert(requirement.query_id.as_str()) {
                return Err(PipelineError::InvalidPolicy(format!(
                    "policy {} lists query {} more than once",
                    self.id, requirement.query_id
                )));
            }
            if !(MIN_SCORE..=MAX_SCORE).contains(&requirement.required_score) {
                return Err(PipelineError::InvalidPolicy(format!(
                    "policy {} requires {} for query {}, outside {}..={}",
                    self.id, requirement.required_score, requirement.query_id, MIN_SCORE, MAX_SCORE
                )));
            }
        }

        if self.transformation_queries.iter().any(|q| q.trim().is_empty()) {
            return Err(PipelineError::InvalidPolicy(format!(
                "policy {} has an empty transformation query id",
                self.id
            )));
        }

        Ok(())
    }

    /// Whether a failed validation may be retried via transformation
    pub fn has_transformations(&self) -> bool {
        !self.transformation_queries.is_empty()
    }

    /// Every query id the policy references, validation first, without duplicates
    pub fn referenced_query_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.validation_scores
            .iter()
            .map(|r| r.query_id.as_str())
            .chain(self.transformation_queries.iter().map(String::as_str))
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
