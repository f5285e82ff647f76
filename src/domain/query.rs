//! Knowledge-service queries and service configuration

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A prompt bound to a knowledge service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeServiceQuery {
    pub query_id: String,

    /// Service that executes this query
    pub knowledge_service_id: String,

    /// Prompt text, never empty
    pub prompt: String,

    /// Service-specific options passed through with the prompt
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Optional assistant-side instruction
    #[serde(default)]
    pub assistant_prompt: Option<String>,
}

impl KnowledgeServiceQuery {
    /// Create a query; the prompt must not be blank
    pub fn new(
        query_id: impl Into<String>,
        knowledge_service_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Result<Self> {
        let query = Self {
            query_id: query_id.into(),
            knowledge_service_id: knowledge_service_id.into(),
            prompt: prompt.into(),
            metadata: Map::new(),
            assistant_prompt: None,
        };

        if query.prompt.trim().is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "query {} has an empty prompt",
                query.query_id
            )));
        }

        Ok(query)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_assistant_prompt(mut self, assistant_prompt: impl Into<String>) -> Self {
        self.assistant_prompt = Some(assistant_prompt.into());
        self
    }
}

/// Connection details for one knowledge service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_id: String,
    pub name: String,

    /// Endpoint override; clients fall back to their configured default
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model override
    #[serde(default)]
    pub model: Option<String>,
}

impl ServiceConfig {
    pub fn new(service_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            name: name.into(),
            endpoint: None,
            model: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
