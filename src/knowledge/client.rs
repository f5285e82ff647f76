//! Knowledge service client interface

use crate::domain::{Document, ServiceConfig};
use crate::errors::Result;
use crate::knowledge::types::{FileHandle, QueryRequest, QueryResult};
use async_trait::async_trait;

/// Transport to a scoring/transformation backend
///
/// Implementations: [`crate::knowledge::OllamaKnowledgeClient`] talks to a
/// real model server, [`crate::knowledge::MemoryKnowledgeClient`] replays
/// scripted answers.
#[async_trait]
pub trait KnowledgeServiceClient: Send + Sync {
    /// Make `document` available to the service and return its handle
    async fn register_document(
        &self,
        config: &ServiceConfig,
        document: &Document,
    ) -> Result<FileHandle>;

    /// Run a prompt against previously registered documents
    async fn execute_query(&self, config: &ServiceConfig, request: QueryRequest)
        -> Result<QueryResult>;

    /// Drop a registration once its run is over
    ///
    /// Backends that keep nothing per handle can rely on the default.
    async fn release_document(&self, _config: &ServiceConfig, _handle: &FileHandle) -> Result<()> {
        Ok(())
    }
}
