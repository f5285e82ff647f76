//! Knowledge service access
//!
//! Provides the client interface, its Ollama and in-memory implementations,
//! and the query gateway the pipeline talks to.

pub mod client;
pub mod gateway;
pub mod memory;
pub mod ollama;
pub mod types;

// Re-export commonly used types
pub use client::KnowledgeServiceClient;
pub use gateway::QueryGateway;
pub use memory::{MemoryKnowledgeClient, QueryCall, RegistrationCall};
pub use ollama::{OllamaKnowledgeClient, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
pub use types::{FileHandle, QueryRequest, QueryResult, Registration, Registrations};
