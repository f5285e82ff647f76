//! Transformation output validation

use crate::errors::{PipelineError, Result};
use crate::knowledge::QueryResult;
use serde::de::IgnoredAny;

/// Validates that a transformation response is JSON
///
/// The response text is returned exactly as received so the stored
/// document keeps the service's formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser;

impl ResultParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, result: &QueryResult) -> Result<String> {
        self.parse_text(&result.response)
    }

    pub fn parse_text(&self, response: &str) -> Result<String> {
        if response.trim().is_empty() {
            return Err(PipelineError::InvalidTransformation(
                "knowledge service returned an empty transformation".to_string(),
            ));
        }

        serde_json::from_str::<IgnoredAny>(response).map_err(|e| {
            PipelineError::InvalidTransformation(format!(
                "transformation output is not valid JSON: {}",
                e
            ))
        })?;

        Ok(response.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_object_returned_verbatim() {
        let text = "{\n  \"title\":   \"Report\",\n  \"items\": [1, 2]\n}";
        assert_eq!(ResultParser::new().parse_text(text).unwrap(), text);
    }

    #[test]
    fn test_scalars_and_arrays_accepted() {
        let parser = ResultParser::new();
        for text in ["[1,2,3]", "\"just text\"", "42", "true", "null", " {} "] {
            assert_eq!(parser.parse_text(text).unwrap(), text);
        }
    }

    #[test]
    fn test_empty_rejected() {
        let parser = ResultParser::new();
        assert!(matches!(parser.parse_text(""), Err(PipelineError::InvalidTransformation(_))));
        assert!(matches!(parser.parse_text(" \n"), Err(PipelineError::InvalidTransformation(_))));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let parser = ResultParser::new();
        for text in ["{\"a\": 1", "Here is your JSON: {}", "{'a': 1}", "{} {}"] {
            assert!(
                matches!(parser.parse_text(text), Err(PipelineError::InvalidTransformation(_))),
                "{:?} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_parse_reads_response_field() {
        let result = QueryResult::new("{\"ok\":true}");
        assert_eq!(ResultParser::new().parse(&result).unwrap(), "{\"ok\":true}");
    }

    #[quickcheck]
    fn prop_serialized_json_is_byte_identical(text: String, n: i32) -> bool {
        let encoded = serde_json::json!({ "text": text, "n": n, "list": [n, n] }).to_string();
        ResultParser::new().parse_text(&encoded).ok().as_deref() == Some(encoded.as_str())
    }
}
