//! Query gateway over a single knowledge service client
//!
//! Resolves service configs, registers documents once per service and runs
//! queries against registered handles. Client failures surface as opaque
//! `GatewayError`s.

use crate::domain::{Document, KnowledgeServiceQuery, ServiceConfig};
use crate::errors::{PipelineError, Result};
use crate::knowledge::client::KnowledgeServiceClient;
use crate::knowledge::types::{FileHandle, QueryRequest, QueryResult, Registrations};
use crate::stores::ServiceConfigStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Gateway between the pipeline and a knowledge service client
#[derive(Clone)]
pub struct QueryGateway {
    client: Arc<dyn KnowledgeServiceClient>,
    services: Arc<dyn ServiceConfigStore>,
}

impl QueryGateway {
    pub fn new(
        client: Arc<dyn KnowledgeServiceClient>,
        services: Arc<dyn ServiceConfigStore>,
    ) -> Self {
        Self { client, services }
    }

    /// Look up a service config; `NotFound` if unknown
    pub async fn service_config(&self, service_id: &str) -> Result<ServiceConfig> {
        self.services.get(service_id).await
    }

    /// Register one document with one service
    pub async fn register_document(
        &self,
        config: &ServiceConfig,
        document: &Document,
    ) -> Result<FileHandle> {
        let handle = self
            .client
            .register_document(config, document)
            .await
            .map_err(|e| gateway_error(&config.service_id, e))?;

        debug!(
            service_id = %config.service_id,
            document_id = %document.id,
            handle = %handle,
            "document registered"
        );
        Ok(handle)
    }

    /// Execute a prompt; the client's answer is returned untouched
    pub async fn execute_query(
        &self,
        config: &ServiceConfig,
        request: QueryRequest,
    ) -> Result<QueryResult> {
        let started = Instant::now();
        let mut result = self
            .client
            .execute_query(config, request)
            .await
            .map_err(|e| gateway_error(&config.service_id, e))?;

        if result.duration_ms == 0 {
            result.duration_ms = started.elapsed().as_millis() as u64;
        }
        Ok(result)
    }

    /// Register `document` once per distinct service id
    pub async fn register_for_services<'a, I>(
        &self,
        service_ids: I,
        document: &Document,
    ) -> Result<Registrations>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut registrations = Registrations::new(document.id.clone());
        for service_id in service_ids {
            if registrations.contains(service_id) {
                continue;
            }
            let registered = match self.service_config(service_id).await {
                Ok(config) => self
                    .register_document(&config, document)
                    .await
                    .map(|handle| (config, handle)),
                Err(e) => Err(e),
            };
            match registered {
                Ok((config, handle)) => registrations.insert(config, handle),
                Err(e) => {
                    self.release(&registrations).await;
                    return Err(e);
                }
            }
        }
        Ok(registrations)
    }

    /// Register `document` with the same services as an earlier registration set
    pub async fn register_like(
        &self,
        template: &Registrations,
        document: &Document,
    ) -> Result<Registrations> {
        let mut registrations = Registrations::new(document.id.clone());
        for config in template.service_configs() {
            match self.register_document(config, document).await {
                Ok(handle) => registrations.insert(config.clone(), handle),
                Err(e) => {
                    self.release(&registrations).await;
                    return Err(e);
                }
            }
        }
        Ok(registrations)
    }

    /// Release every handle in `registrations`
    ///
    /// Release failures are logged and skipped; they never change the
    /// outcome of the run that owned the registrations.
    pub async fn release(&self, registrations: &Registrations) {
        for registration in registrations.iter() {
            let config = &registration.config;
            match self.client.release_document(config, &registration.handle).await {
                Ok(()) => debug!(
                    service_id = %config.service_id,
                    document_id = %registrations.document_id(),
                    handle = %registration.handle,
                    "registration released"
                ),
                Err(e) => warn!(
                    service_id = %config.service_id,
                    handle = %registration.handle,
                    error = %e,
                    "could not release registration"
                ),
            }
        }
    }

    /// Run `query` against the document behind `registrations`
    pub async fn execute_registered(
        &self,
        query: &KnowledgeServiceQuery,
        registrations: &Registrations,
    ) -> Result<QueryResult> {
        let registration = registrations.get(&query.knowledge_service_id)?;
        let request = QueryRequest {
            prompt: query.prompt.clone(),
            file_handles: vec![registration.handle.clone()],
            metadata: query.metadata.clone(),
            assistant_prompt: query.assistant_prompt.clone(),
        };

        let result = self.execute_query(&registration.config, request).await?;
        debug!(
            query_id = %query.query_id,
            service_id = %query.knowledge_service_id,
            duration_ms = result.duration_ms,
            "query executed"
        );
        Ok(result)
    }
}

fn gateway_error(service_id: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::GatewayError(_) => err,
        other => PipelineError::GatewayError(format!("{}: {}", service_id, other)),
    }
}
