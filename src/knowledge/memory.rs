//! Scripted in-memory knowledge service
//!
//! Answers are keyed by prompt text. A scripted sequence is consumed in
//! order and its last answer repeats once the sequence runs out. Every
//! registration, query and release is logged for inspection.

use crate::domain::{Document, ServiceConfig};
use crate::errors::{PipelineError, Result};
use crate::knowledge::client::KnowledgeServiceClient;
use crate::knowledge::types::{FileHandle, QueryRequest, QueryResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::Mutex;

/// One scripted answer
#[derive(Debug, Clone)]
enum Scripted {
    Respond(String),
    Fail(String),
}

/// A logged registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCall {
    pub service_id: String,
    pub document_id: String,
    pub handle: FileHandle,
}

/// A logged query execution
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCall {
    pub service_id: String,
    pub prompt: String,
    pub file_handles: Vec<FileHandle>,
    pub assistant_prompt: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    scripts: HashMap<String, VecDeque<Scripted>>,
    failing_services: HashSet<String>,
    registration_quota: Option<usize>,
    // every handle ever issued, released or not
    handles: HashMap<FileHandle, String>,
    live: HashSet<FileHandle>,
    registrations: Vec<RegistrationCall>,
    queries: Vec<QueryCall>,
    released: Vec<FileHandle>,
    next_handle: u64,
}

/// Test double for [`KnowledgeServiceClient`]
#[derive(Debug, Default)]
pub struct MemoryKnowledgeClient {
    state: Mutex<MemoryState>,
}

impl MemoryKnowledgeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `prompt` with `response`
    pub fn with_response(self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.with_responses(prompt, [response.into()])
    }

    /// Answer successive calls for `prompt` with `responses` in order
    pub fn with_responses<I, S>(mut self, prompt: impl Into<String>, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .get_mut()
            .scripts
            .entry(prompt.into())
            .or_default()
            .extend(responses.into_iter().map(|r| Scripted::Respond(r.into())));
        self
    }

    /// Fail the next call for `prompt` (and every later one, if last)
    pub fn with_failure(mut self, prompt: impl Into<String>, message: impl Into<String>) -> Self {
        self.state
            .get_mut()
            .scripts
            .entry(prompt.into())
            .or_default()
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Reject every registration with `service_id`
    pub fn with_failing_registration(mut self, service_id: impl Into<String>) -> Self {
        self.state.get_mut().failing_services.insert(service_id.into());
        self
    }

    /// Accept only the first `quota` registrations, then reject the rest
    pub fn with_registration_quota(mut self, quota: usize) -> Self {
        self.state.get_mut().registration_quota = Some(quota);
        self
    }

    pub async fn registrations(&self) -> Vec<RegistrationCall> {
        self.state.lock().await.registrations.clone()
    }

    pub async fn queries(&self) -> Vec<QueryCall> {
        self.state.lock().await.queries.clone()
    }

    /// Handles registered and not yet released
    pub async fn live_handles(&self) -> Vec<FileHandle> {
        let state = self.state.lock().await;
        state
            .registrations
            .iter()
            .map(|r| r.handle.clone())
            .filter(|h| state.live.contains(h))
            .collect()
    }

    pub async fn released(&self) -> Vec<FileHandle> {
        self.state.lock().await.released.clone()
    }

    /// Document id behind a handle issued by this client
    pub async fn document_for(&self, handle: &FileHandle) -> Option<String> {
        self.state.lock().await.handles.get(handle).cloned()
    }
}

#[async_trait]
impl KnowledgeServiceClient for MemoryKnowledgeClient {
    async fn register_document(
        &self,
        config: &ServiceConfig,
        document: &Document,
    ) -> Result<FileHandle> {
        let mut state = self.state.lock().await;
        if state.failing_services.contains(&config.service_id) {
            return Err(PipelineError::GatewayError(format!(
                "{} rejected document {}",
                config.service_id, document.id
            )));
        }
        if let Some(quota) = state.registration_quota {
            if state.registrations.len() >= quota {
                return Err(PipelineError::GatewayError(format!(
                    "{} registration quota of {} exhausted",
                    config.service_id, quota
                )));
            }
        }

        state.next_handle += 1;
        let handle = FileHandle::new(format!("mem-{}-{}", config.service_id, state.next_handle));
        state.handles.insert(handle.clone(), document.id.clone());
        state.live.insert(handle.clone());
        state.registrations.push(RegistrationCall {
            service_id: config.service_id.clone(),
            document_id: document.id.clone(),
            handle: handle.clone(),
        });
        Ok(handle)
    }

    async fn execute_query(
        &self,
        config: &ServiceConfig,
        request: QueryRequest,
    ) -> Result<QueryResult> {
        let mut state = self.state.lock().await;

        if let Some(unknown) = request
            .file_handles
            .iter()
            .find(|h| !state.live.contains(*h))
        {
            return Err(PipelineError::GatewayError(format!(
                "unknown file handle {}",
                unknown
            )));
        }

        state.queries.push(QueryCall {
            service_id: config.service_id.clone(),
            prompt: request.prompt.clone(),
            file_handles: request.file_handles.clone(),
            assistant_prompt: request.assistant_prompt.clone(),
        });

        let answer = match state.scripts.get_mut(&request.prompt) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match answer {
            Some(Scripted::Respond(response)) => Ok(QueryResult {
                response,
                model: Some("memory".to_string()),
                duration_ms: 0,
            }),
            Some(Scripted::Fail(message)) => Err(PipelineError::GatewayError(message)),
            None => Err(PipelineError::GatewayError(format!(
                "no scripted response for prompt {:?}",
                request.prompt
            ))),
        }
    }

    async fn release_document(&self, _config: &ServiceConfig, handle: &FileHandle) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.live.remove(handle) {
            return Err(PipelineError::GatewayError(format!(
                "release of unknown file handle {}",
                handle
            )));
        }
        state.released.push(handle.clone());
        Ok(())
    }
}
