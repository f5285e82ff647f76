//! Document transformation via knowledge-service queries
//!
//! Every transformation query runs against the ORIGINAL document's
//! registration, in policy order. Each output must be JSON; the output of the
//! last query becomes the content of a new document. Earlier outputs are
//! validated and then discarded.

use crate::domain::{Document, KnowledgeServiceQuery};
use crate::errors::{PipelineError, Result};
use crate::knowledge::{QueryGateway, Registrations};
use crate::parsing::ResultParser;
use crate::stores::DocumentStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Content type of transformed documents
pub const TRANSFORMED_CONTENT_TYPE: &str = "application/json";

/// Filename prefix of transformed documents
pub const TRANSFORMED_PREFIX: &str = "transformed_";

/// Applies a policy's transformation queries to a document
#[derive(Clone)]
pub struct TransformationEngine {
    gateway: QueryGateway,
    documents: Arc<dyn DocumentStore>,
    parser: ResultParser,
}

impl TransformationEngine {
    pub fn new(gateway: QueryGateway, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            gateway,
            documents,
            parser: ResultParser::new(),
        }
    }

    /// Produce and save a new document from `document`
    ///
    /// `registrations` must belong to `document`. Any failing step aborts the
    /// whole transformation with `InvalidTransformation`; nothing is saved.
    pub async fn transform(
        &self,
        document: &Document,
        queries: &[KnowledgeServiceQuery],
        registrations: &Registrations,
    ) -> Result<Document> {
        if queries.is_empty() {
            return Err(PipelineError::InvalidTransformation(
                "no transformation queries to apply".to_string(),
            ));
        }

        if registrations.document_id() != document.id {
            return Err(PipelineError::InvalidTransformation(format!(
                "registrations belong to document {}, not {}",
                registrations.document_id(),
                document.id
            )));
        }

        let mut content = None;
        for (step, query) in queries.iter().enumerate() {
            let output = self
                .run_step(query, registrations)
                .await
                .map_err(|e| step_error(step + 1, &query.query_id, e))?;

            debug!(
                step = step + 1,
                query_id = %query.query_id,
                bytes = output.len(),
                "transformation step complete"
            );
            content = Some(output);
        }

        let content = content.ok_or_else(|| {
            PipelineError::InvalidTransformation("transformation produced no output".to_string())
        })?;

        let transformed = Document::new(
            self.documents.generate_id().await?,
            format!("{}{}", TRANSFORMED_PREFIX, document.filename),
            TRANSFORMED_CONTENT_TYPE,
            content,
        );
        self.documents.save(transformed.clone()).await?;

        info!(
            source_document_id = %document.id,
            transformed_document_id = %transformed.id,
            steps = queries.len(),
            "document transformed"
        );
        Ok(transformed)
    }

    async fn run_step(
        &self,
        query: &KnowledgeServiceQuery,
        registrations: &Registrations,
    ) -> Result<String> {
        let result = self.gateway.execute_registered(query, registrations).await?;
        self.parser.parse(&result)
    }
}

fn step_error(step: usize, query_id: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::InvalidTransformation(msg) => PipelineError::InvalidTransformation(format!(
            "step {} ({}): {}",
            step, query_id, msg
        )),
        other => PipelineError::InvalidTransformation(format!(
            "step {} ({}) failed: {}",
            step, query_id, other
        )),
    }
}
