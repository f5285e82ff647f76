//! Score extraction from validation query responses

use crate::errors::{PipelineError, Result};
use crate::knowledge::QueryResult;
use std::num::IntErrorKind;

/// Longest response echoed back in a parse error
const MAX_ECHO_CHARS: usize = 80;

/// Strict integer score parser
///
/// The trimmed response must be a base-10 integer. The value is returned
/// unchanged: range checks belong to the validation record. Integers too
/// large for `i64` saturate to `i64::MAX`/`i64::MIN` so they still reach
/// that range check.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreParser;

impl ScoreParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, result: &QueryResult) -> Result<i64> {
        self.parse_text(&result.response)
    }

    pub fn parse_text(&self, response: &str) -> Result<i64> {
        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::ParseError(
                "knowledge service returned an empty score response".to_string(),
            ));
        }

        match trimmed.parse::<i64>() {
            Ok(score) => Ok(score),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Ok(i64::MAX),
                IntErrorKind::NegOverflow => Ok(i64::MIN),
                _ => Err(PipelineError::ParseError(format!(
                    "expected an integer score, got {:?}",
                    echo(trimmed)
                ))),
            },
        }
    }
}

fn echo(text: &str) -> String {
    if text.chars().count() <= MAX_ECHO_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ECHO_CHARS).collect();
        format!("{}...", head)
    }
}
