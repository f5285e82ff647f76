//! In-memory store implementations

use crate::domain::{Document, KnowledgeServiceQuery, Policy, ServiceConfig};
use crate::errors::{PipelineError, Result};
use crate::stores::{DocumentStore, PolicyStore, QueryStore, ServiceConfigStore, ValidationRecordStore};
use crate::validation::{DocumentPolicyValidation, ValidationStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// Documents keyed by id; saved documents are immutable
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store; integrity is checked on save, as for any document
    pub async fn with_documents(documents: impl IntoIterator<Item = Document>) -> Result<Self> {
        let store = Self::new();
        for document in documents {
            store.save(document).await?;
        }
        Ok(store)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: &str) -> Result<Document> {
        self.documents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("Document", id))
    }

    async fn save(&self, document: Document) -> Result<()> {
        document.verify_integrity()?;

        let mut documents = self.documents.write().await;
        if let Some(existing) = documents.get(&document.id) {
            if existing.content_hash != document.content_hash {
                return Err(PipelineError::IntegrityError(format!(
                    "document {} already saved with different content",
                    document.id
                )));
            }
        }
        documents.insert(document.id.clone(), document);
        Ok(())
    }

    async fn generate_id(&self) -> Result<String> {
        Ok(new_id("doc"))
    }
}

/// Policies keyed by id
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: RwLock<HashMap<String, Policy>>,
}

impl InMemoryPolicyStore {
    pub fn new(policies: impl IntoIterator<Item = Policy>) -> Self {
        Self {
            policies: RwLock::new(policies.into_iter().map(|p| (p.id.clone(), p)).collect()),
        }
    }

    pub async fn insert(&self, policy: Policy) -> Result<()> {
        policy.validate()?;
        self.policies.write().await.insert(policy.id.clone(), policy);
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get(&self, id: &str) -> Result<Policy> {
        self.policies
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("Policy", id))
    }
}

/// Knowledge-service queries keyed by query id
#[derive(Debug, Default)]
pub struct InMemoryQueryStore {
    queries: RwLock<HashMap<String, KnowledgeServiceQuery>>,
}

impl InMemoryQueryStore {
    pub fn new(queries: impl IntoIterator<Item = KnowledgeServiceQuery>) -> Self {
        Self {
            queries: RwLock::new(
                queries
                    .into_iter()
                    .map(|q| (q.query_id.clone(), q))
                    .collect(),
            ),
        }
    }

    pub async fn insert(&self, query: KnowledgeServiceQuery) {
        self.queries.write().await.insert(query.query_id.clone(), query);
    }
}

#[async_trait]
impl QueryStore for InMemoryQueryStore {
    async fn get(&self, query_id: &str) -> Result<KnowledgeServiceQuery> {
        self.queries
            .read()
            .await
            .get(query_id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("KnowledgeServiceQuery", query_id))
    }
}

/// Service configs keyed by service id
#[derive(Debug, Default)]
pub struct InMemoryServiceConfigStore {
    services: RwLock<HashMap<String, ServiceConfig>>,
}

impl InMemoryServiceConfigStore {
    pub fn new(services: impl IntoIterator<Item = ServiceConfig>) -> Self {
        Self {
            services: RwLock::new(
                services
                    .into_iter()
                    .map(|s| (s.service_id.clone(), s))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ServiceConfigStore for InMemoryServiceConfigStore {
    async fn get(&self, service_id: &str) -> Result<ServiceConfig> {
        self.services
            .read()
            .await
            .get(service_id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("ServiceConfig", service_id))
    }
}

/// Validation records plus the full history of saved snapshots
#[derive(Debug, Default)]
pub struct InMemoryValidationRecordStore {
    records: RwLock<HashMap<String, DocumentPolicyValidation>>,
    history: RwLock<Vec<DocumentPolicyValidation>>,
}

impl InMemoryValidationRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every saved snapshot of one record, oldest first
    pub async fn snapshots(&self, id: &str) -> Vec<DocumentPolicyValidation> {
        self.history
            .read()
            .await
            .iter()
            .filter(|r| r.validation_id == id)
            .cloned()
            .collect()
    }

    /// Persisted status trail of one record
    pub async fn status_history(&self, id: &str) -> Vec<ValidationStatus> {
        self.snapshots(id).await.into_iter().map(|r| r.status).collect()
    }

    pub async fn all(&self) -> Vec<DocumentPolicyValidation> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ValidationRecordStore for InMemoryValidationRecordStore {
    async fn get(&self, id: &str) -> Result<DocumentPolicyValidation> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("DocumentPolicyValidation", id))
    }

    async fn save(&self, record: &DocumentPolicyValidation) -> Result<()> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&record.validation_id) {
            if existing.is_terminal() {
                return Err(PipelineError::InvalidInput(format!(
                    "validation {} is {} and can no longer change",
                    existing.validation_id, existing.status
                )));
            }
        }
        records.insert(record.validation_id.clone(), record.clone());
        self.history.write().await.push(record.clone());
        Ok(())
    }

    async fn generate_id(&self) -> Result<String> {
        Ok(new_id("val"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScoreRequirement;
    use bytes::Bytes;
    use chrono::Utc;

    #[tokio::test]
    async fn test_document_round_trip() {
        let store = InMemoryDocumentStore::new();
        let doc = Document::new("doc-1", "a.txt", "text/plain", "content");
        store.save(doc.clone()).await.unwrap();

        assert_eq!(store.get("doc-1").await.unwrap(), doc);
        assert!(store.get("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_document_hash_checked_on_save() {
        let store = InMemoryDocumentStore::new();
        let mut doc = Document::new("doc-1", "a.txt", "text/plain", "content");
        doc.content = Bytes::from_static(b"CONTENT");

        let err = store.save(doc).await.unwrap_err();
        assert!(matches!(err, PipelineError::IntegrityError(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_saved_document_cannot_change() {
        let store = InMemoryDocumentStore::new();
        store
            .save(Document::new("doc-1", "a.txt", "text/plain", "one"))
            .await
            .unwrap();

        let result = store
            .save(Document::new("doc-1", "a.txt", "text/plain", "two"))
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("doc-1").await.unwrap().text(), "one");
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let store = InMemoryDocumentStore::new();
        let a = store.generate_id().await.unwrap();
        let b = store.generate_id().await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("doc-"));
    }

    #[tokio::test]
    async fn test_policy_store() {
        let policy = Policy::new("p1", "Quality", vec![ScoreRequirement::new("q1", 80)], vec![]).unwrap();
        let store = InMemoryPolicyStore::new(vec![policy.clone()]);

        assert_eq!(store.get("p1").await.unwrap(), policy);
        assert!(store.get("p2").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_record_history_and_terminal_lock() {
        let store = InMemoryValidationRecordStore::new();
        let mut record = DocumentPolicyValidation::new("val-1", "doc-1", "p1", Utc::now());
        store.save(&record).await.unwrap();

        record.transition_to(ValidationStatus::InProgress).unwrap();
        store.save(&record).await.unwrap();

        record.fail("boom", Utc::now()).unwrap();
        store.save(&record).await.unwrap();

        assert_eq!(
            store.status_history("val-1").await,
            vec![
                ValidationStatus::Pending,
                ValidationStatus::InProgress,
                ValidationStatus::Error
            ]
        );

        // terminal records are frozen
        assert!(store.save(&record).await.is_err());
        assert_eq!(store.get("val-1").await.unwrap().status, ValidationStatus::Error);
    }

    #[test]
    fn test_generated_ids_are_prefixed_and_unique() {
        let documents = InMemoryDocumentStore::new();
        let records = InMemoryValidationRecordStore::new();

        let (a, b, v) = tokio_test::block_on(async {
            (
                documents.generate_id().await.unwrap(),
                documents.generate_id().await.unwrap(),
                records.generate_id().await.unwrap(),
            )
        });

        assert!(a.starts_with("doc-"));
        assert!(v.starts_with("val-"));
        assert_ne!(a, b);
    }
}
