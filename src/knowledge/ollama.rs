//! Ollama-backed knowledge service
//!
//! Ollama has no file API, so registration keeps the document text in the
//! client under a generated handle and every query inlines the referenced
//! documents ahead of the prompt. The text is dropped again on release.
//! - Endpoint: POST /api/generate (non-streaming)
//! - Assistant prompt → `system`, query metadata → `options`

use crate::config::KnowledgeConfig;
use crate::domain::{Document, ServiceConfig};
use crate::errors::{PipelineError, Result};
use crate::knowledge::client::KnowledgeServiceClient;
use crate::knowledge::types::{FileHandle, QueryRequest, QueryResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Request timeout (120 seconds); scoring whole documents is slow
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
struct RegisteredDocument {
    filename: String,
    text: String,
}

/// Knowledge service client for an Ollama server
#[derive(Debug)]
pub struct OllamaKnowledgeClient {
    client: Client,
    base_url: String,
    model: String,
    documents: RwLock<HashMap<FileHandle, RegisteredDocument>>,
}

impl OllamaKnowledgeClient {
    /// Create client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL, REQUEST_TIMEOUT)
    }

    /// Create client with custom configuration
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipelineError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            documents: RwLock::new(HashMap::new()),
        })
    }

    /// Create client from the `[knowledge]` config section
    pub fn from_config(config: &KnowledgeConfig) -> Result<Self> {
        Self::with_config(
            &config.base_url(),
            &config.default_model,
            Duration::from_secs(config.request_timeout_sec),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of documents currently held for inlining
    pub async fn registered_documents(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Check if the server answers
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Inline referenced documents ahead of the prompt
    async fn build_prompt(&self, request: &QueryRequest) -> Result<String> {
        let documents = self.documents.read().await;
        let mut prompt = String::new();

        for handle in &request.file_handles {
            let doc = documents.get(handle).ok_or_else(|| {
                PipelineError::GatewayError(format!("unknown file handle {}", handle))
            })?;
            prompt.push_str(&format!(
                "<document name=\"{}\">\n{}\n</document>\n\n",
                doc.filename, doc.text
            ));
        }

        prompt.push_str(&request.prompt);
        Ok(prompt)
    }
}

#[async_trait]
impl KnowledgeServiceClient for OllamaKnowledgeClient {
    async fn register_document(
        &self,
        config: &ServiceConfig,
        document: &Document,
    ) -> Result<FileHandle> {
        let handle = FileHandle::new(format!("ollama-{}-{}", config.service_id, Uuid::new_v4()));
        self.documents.write().await.insert(
            handle.clone(),
            RegisteredDocument {
                filename: document.filename.clone(),
                text: document.text().into_owned(),
            },
        );
        Ok(handle)
    }

    async fn release_document(&self, _config: &ServiceConfig, handle: &FileHandle) -> Result<()> {
        self.documents.write().await.remove(handle);
        Ok(())
    }

    async fn execute_query(
        &self,
        config: &ServiceConfig,
        request: QueryRequest,
    ) -> Result<QueryResult> {
        let base_url = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .unwrap_or(self.base_url.as_str());
        let url = format!("{}/api/generate", base_url);

        let body = OllamaGenerateRequest {
            model: config.model.clone().unwrap_or_else(|| self.model.clone()),
            prompt: self.build_prompt(&request).await?,
            system: request.assistant_prompt.clone(),
            stream: false,
            options: if request.metadata.is_empty() {
                None
            } else {
                Some(request.metadata.clone())
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::GatewayError(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::GatewayError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let generated: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::GatewayError(format!("Failed to parse response: {}", e)))?;

        Ok(QueryResult {
            response: generated.response,
            model: Some(generated.model),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Map<String, Value>>,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    model: String,
    response: String,
}
