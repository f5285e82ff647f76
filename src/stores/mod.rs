//! Repository interfaces the pipeline reads from and writes to
//!
//! Concrete persistence engines live outside this crate. The in-memory
//! implementations in [`memory`] back tests and embedded use.

pub mod memory;

use crate::domain::{Document, KnowledgeServiceQuery, Policy, ServiceConfig};
use crate::errors::Result;
use crate::validation::DocumentPolicyValidation;
use async_trait::async_trait;

pub use memory::{
    InMemoryDocumentStore, InMemoryPolicyStore, InMemoryQueryStore, InMemoryServiceConfigStore,
    InMemoryValidationRecordStore,
};

/// Document repository
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `NotFound` if absent
    async fn get(&self, id: &str) -> Result<Document>;

    /// Persist a document. Content must match its recorded hash.
    async fn save(&self, document: Document) -> Result<()>;

    async fn generate_id(&self) -> Result<String>;
}

/// Policy repository
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Policy>;
}

/// Knowledge-service query repository
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn get(&self, query_id: &str) -> Result<KnowledgeServiceQuery>;
}

/// Knowledge-service configuration repository
#[async_trait]
pub trait ServiceConfigStore: Send + Sync {
    async fn get(&self, service_id: &str) -> Result<ServiceConfig>;
}

/// Validation record repository
#[async_trait]
pub trait ValidationRecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<DocumentPolicyValidation>;

    /// Insert or replace a record. Terminal records may not be replaced.
    async fn save(&self, record: &DocumentPolicyValidation) -> Result<()>;

    async fn generate_id(&self) -> Result<String>;
}
