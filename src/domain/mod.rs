//! Domain entities consumed by the validation pipeline
//!
//! Documents, policies, knowledge-service queries and service configs are
//! read-only inputs to a run. The validation record itself lives in
//! [`crate::validation::types`].

pub mod document;
pub mod policy;
pub mod query;

pub use document::Document;
pub use policy::{Policy, ScoreRequirement, MAX_SCORE, MIN_SCORE};
pub use query::{KnowledgeServiceQuery, ServiceConfig};
