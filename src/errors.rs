//! Error types for the document policy pipeline
//!
//! Every component returns the crate [`Result`]; the orchestrator maps any
//! of these into the ERROR state of a validation record.

use thiserror::Error;

/// Main error type for validation and transformation runs
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Malformed score response from a knowledge service
    #[error("Score parse error: {0}")]
    ParseError(String),

    /// Missing or malformed transformation output
    #[error("Invalid transformation: {0}")]
    InvalidTransformation(String),

    /// Opaque failure reported by a knowledge service
    #[error("Knowledge service error: {0}")]
    GatewayError(String),

    /// Reported score outside the [0, 100] contract
    #[error("Invalid score {score} for query {query_id}: must be between 0 and 100")]
    InvalidScore { query_id: String, score: i64 },

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Policy definition violates its invariants
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// State machine transition errors
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Stored content does not match its recorded hash
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    /// Shorthand for a missing entity
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        PipelineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether this error means a referenced entity is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::NotFound { .. })
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Convert anyhow errors raised at the config boundary
impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::ConfigError(format!("{:#}", err))
    }
}
