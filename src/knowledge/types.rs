//! Knowledge service request/response types

use crate::domain::ServiceConfig;
use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Opaque reference to a document registered with a service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(String);

impl FileHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A prompt to run against registered documents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    pub file_handles: Vec<FileHandle>,
    pub metadata: Map<String, Value>,
    pub assistant_prompt: Option<String>,
}

/// Raw answer from a knowledge service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Free-text response body
    pub response: String,

    /// Model that produced the response, if reported
    pub model: Option<String>,

    /// Wall time of the call
    pub duration_ms: u64,
}

impl QueryResult {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Default::default()
        }
    }
}

/// A document's registration with one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub config: ServiceConfig,
    pub handle: FileHandle,
}

/// Per-run cache of service_id → registration for one document
///
/// Built once per document and never shared between runs.
#[derive(Debug, Clone, Default)]
pub struct Registrations {
    document_id: String,
    entries: HashMap<String, Registration>,
    order: Vec<String>,
}

impl Registrations {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn contains(&self, service_id: &str) -> bool {
        self.entries.contains_key(service_id)
    }

    pub fn insert(&mut self, config: ServiceConfig, handle: FileHandle) {
        let service_id = config.service_id.clone();
        if self
            .entries
            .insert(service_id.clone(), Registration { config, handle })
            .is_none()
        {
            self.order.push(service_id);
        }
    }

    pub fn get(&self, service_id: &str) -> Result<&Registration> {
        self.entries.get(service_id).ok_or_else(|| {
            PipelineError::not_found(
                "Registration",
                format!("{} for document {}", service_id, self.document_id),
            )
        })
    }

    /// Configs in registration order
    /// Registrations in the order they were made
    pub fn iter(&self) -> impl Iterator<Item = &Registration> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn service_configs(&self) -> impl Iterator<Item = &ServiceConfig> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|r| &r.config))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
