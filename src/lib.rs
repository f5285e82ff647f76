//! docpolicy - Document Policy Validation
//!
//! Validates documents against quality policies by asking knowledge services
//! (LLM backends) to score them, and transforms failing documents before
//! validating them again.
//!
//! # Architecture
//!
//! - **validation**: run state machine, records, evaluator, orchestrator
//! - **knowledge**: service clients and the query gateway
//! - **parsing**: score and transformation response parsers
//! - **transformation**: builds new documents from transformation queries
//! - **stores**: repository interfaces + in-memory implementations

pub mod errors;
pub mod clock;
pub mod config;
pub mod domain;
pub mod knowledge;
pub mod parsing;
pub mod stores;
pub mod telemetry;
pub mod transformation;
pub mod validation;

// Re-export commonly used types
pub use errors::{PipelineError, Result};
pub use validation::{DocumentPolicyValidation, ValidationOrchestrator, ValidationStatus};
