//! Validation run state machine
//!
//! Status only moves forward through a run. The single re-entry edge is
//! TransformationComplete → InProgress, which starts re-validation of the
//! transformed document. Error is reachable from every non-terminal state.

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a document policy validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// Record created, inputs not yet resolved
    Pending,

    /// Validation queries running (initial or re-validation)
    InProgress,

    /// Initial scores captured
    ValidationComplete,

    /// Initial scores failed and the policy can transform
    TransformationRequired,

    /// Transformation queries running
    TransformationInProgress,

    /// Transformed document saved
    TransformationComplete,

    /// Policy satisfied (terminal)
    Passed,

    /// Policy not satisfied (terminal)
    Failed,

    /// Run aborted by an error (terminal)
    Error,
}

impl ValidationStatus {
    /// Check if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ValidationStatus::Passed | ValidationStatus::Failed | ValidationStatus::Error
        )
    }

    /// Attempt a status transition
    ///
    /// Valid transitions:
    /// 1.  Pending                  → InProgress
    /// 2.  InProgress               → ValidationComplete
    /// 3.  InProgress               → Passed | Failed      (re-validation only;
    ///                                                      the record checks it)
    /// 4.  ValidationComplete       → Passed | Failed
    /// 5.  ValidationComplete       → TransformationRequired
    /// 6.  TransformationRequired   → TransformationInProgress
    /// 7.  TransformationInProgress → TransformationComplete
    /// 8.  TransformationComplete   → InProgress
    /// 9.  any non-terminal         → Error
    pub fn transition(&self, next: ValidationStatus) -> Result<ValidationStatus> {
        use ValidationStatus::*;

        let allowed = match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Error) => true,
            (Pending, InProgress) => true,
            (InProgress, ValidationComplete) => true,
            (InProgress, Passed | Failed) => true,
            (ValidationComplete, Passed | Failed | TransformationRequired) => true,
            (TransformationRequired, TransformationInProgress) => true,
            (TransformationInProgress, TransformationComplete) => true,
            (TransformationComplete, InProgress) => true,
            _ => false,
        };

        if !allowed {
            return Err(PipelineError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }

        Ok(next)
    }

    /// Wire name, as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "PENDING",
            ValidationStatus::InProgress => "IN_PROGRESS",
            ValidationStatus::ValidationComplete => "VALIDATION_COMPLETE",
            ValidationStatus::TransformationRequired => "TRANSFORMATION_REQUIRED",
            ValidationStatus::TransformationInProgress => "TRANSFORMATION_IN_PROGRESS",
            ValidationStatus::TransformationComplete => "TRANSFORMATION_COMPLETE",
            ValidationStatus::Passed => "PASSED",
            ValidationStatus::Failed => "FAILED",
            ValidationStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ValidationStatus::*;

    const ALL: [ValidationStatus; 9] = [
        Pending,
        InProgress,
        ValidationComplete,
        TransformationRequired,
        TransformationInProgress,
        TransformationComplete,
        Passed,
        Failed,
        Error,
    ];

    #[test]
    fn test_happy_path_without_transformation() {
        let status = Pending.transition(InProgress).unwrap();
        let status = status.transition(ValidationComplete).unwrap();
        assert_eq!(status.transition(Passed).unwrap(), Passed);
        assert_eq!(status.transition(Failed).unwrap(), Failed);
    }

    #[test]
    fn test_transformation_path() {
        let mut status = ValidationComplete;
        for next in [
            TransformationRequired,
            TransformationInProgress,
            TransformationComplete,
            InProgress,
            Passed,
        ] {
            status = status.transition(next).unwrap();
        }
        assert_eq!(status, Passed);
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for terminal in [Passed, Failed, Error] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(terminal.transition(next).is_err());
            }
        }
    }

    #[test]
    fn test_error_from_any_non_terminal_state() {
        for state in ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(state.transition(Error).unwrap(), Error);
        }
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(ValidationComplete.transition(InProgress).is_err());
        assert!(InProgress.transition(Pending).is_err());
        assert!(TransformationComplete.transition(TransformationRequired).is_err());
        assert!(Pending.transition(ValidationComplete).is_err());
        assert!(Pending.transition(Passed).is_err());
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&TransformationInProgress).unwrap();
        assert_eq!(json, "\"TRANSFORMATION_IN_PROGRESS\"");
        for status in ALL {
            let encoded = serde_json::to_string(&status).unwrap();
            assert_eq!(encoded, format!("\"{}\"", status));
        }
    }
}
