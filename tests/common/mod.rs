//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use docpolicy::clock::FixedClock;
use docpolicy::domain::{Document, KnowledgeServiceQuery, Policy, ScoreRequirement, ServiceConfig};
use docpolicy::knowledge::MemoryKnowledgeClient;
use docpolicy::stores::{
    InMemoryDocumentStore, InMemoryPolicyStore, InMemoryQueryStore, InMemoryServiceConfigStore,
    InMemoryValidationRecordStore,
};
use docpolicy::validation::{DocumentPolicyValidation, PipelineStores, ValidationOrchestrator};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub const DOC_ID: &str = "doc-1";
pub const DOC_FILENAME: &str = "report.txt";
pub const POLICY_ID: &str = "policy-1";

pub struct Harness {
    pub orchestrator: ValidationOrchestrator,
    pub documents: Arc<InMemoryDocumentStore>,
    pub records: Arc<InMemoryValidationRecordStore>,
    pub client: Arc<MemoryKnowledgeClient>,
}

impl Harness {
    /// The only record in the store; used when `validate` returned an error
    pub async fn only_record(&self) -> DocumentPolicyValidation {
        let all = self.records.all().await;
        assert_eq!(all.len(), 1, "expected exactly one validation record");
        all.into_iter().next().unwrap()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig::new("svc-a", "Primary scorer"),
        ServiceConfig::new("svc-b", "Secondary scorer"),
    ]
}

pub fn query(id: &str, service: &str, prompt: &str) -> KnowledgeServiceQuery {
    KnowledgeServiceQuery::new(id, service, prompt).unwrap()
}

/// Standard queries: q1/q2 score, t1/t2 transform, all on svc-a
pub fn standard_queries() -> Vec<KnowledgeServiceQuery> {
    vec![
        query("q1", "svc-a", "Rate the quality from 0 to 100"),
        query("q2", "svc-a", "Rate the clarity from 0 to 100"),
        query("t1", "svc-a", "Rewrite the document as JSON"),
        query("t2", "svc-a", "Polish the JSON document"),
    ]
}

pub fn policy(requirements: &[(&str, i64)], transformations: &[&str]) -> Policy {
    Policy::new(
        POLICY_ID,
        "Quality policy",
        requirements
            .iter()
            .map(|(q, r)| ScoreRequirement::new(*q, *r))
            .collect(),
        transformations.iter().map(|t| t.to_string()).collect(),
    )
    .unwrap()
}

pub async fn harness(
    policy: Policy,
    queries: Vec<KnowledgeServiceQuery>,
    client: MemoryKnowledgeClient,
) -> Harness {
    let documents = Arc::new(
        InMemoryDocumentStore::with_documents(vec![Document::new(
            DOC_ID,
            DOC_FILENAME,
            "text/plain",
            "High quality...",
        )])
        .await
        .unwrap(),
    );
    let records = Arc::new(InMemoryValidationRecordStore::new());
    let client = Arc::new(client);

    let stores = PipelineStores {
        documents: documents.clone(),
        policies: Arc::new(InMemoryPolicyStore::new(vec![policy])),
        queries: Arc::new(InMemoryQueryStore::new(queries)),
        services: Arc::new(InMemoryServiceConfigStore::new(services())),
        records: records.clone(),
    };

    let orchestrator = ValidationOrchestrator::new(stores, client.clone())
        .with_clock(Arc::new(FixedClock::new(start_time())));

    Harness {
        orchestrator,
        documents,
        records,
        client,
    }
}
