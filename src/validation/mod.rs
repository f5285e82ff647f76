//! Document policy validation
//! Record types, status state machine, pass/fail evaluation and the run orchestrator

pub mod evaluator;
pub mod orchestrator;
pub mod state;
pub mod types;

pub use evaluator::PolicyEvaluator;
pub use orchestrator::{PipelineStores, ValidationOrchestrator};
pub use state::ValidationStatus;
pub use types::{score_map, DocumentPolicyValidation, QueryScore};
