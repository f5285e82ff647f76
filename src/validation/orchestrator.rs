//! Validation orchestration
//!
//! Drives one run of the document policy state machine. The record is
//! persisted after every status change so that an interrupted run leaves a
//! checkpoint showing the last completed step. Any error inside a run is
//! caught in one place, recorded as ERROR, persisted and returned to the
//! caller. The orchestrator never retries. Registrations belong to a single
//! run and are released when it ends, whatever the outcome.

use crate::clock::{Clock, SystemClock};
use crate::domain::{Document, KnowledgeServiceQuery, Policy};
use crate::errors::{PipelineError, Result};
use crate::knowledge::{KnowledgeServiceClient, QueryGateway, Registrations};
use crate::parsing::ScoreParser;
use crate::stores::{DocumentStore, PolicyStore, QueryStore, ServiceConfigStore, ValidationRecordStore};
use crate::telemetry::{TelemetryEvent, ValidationTelemetry};
use crate::transformation::TransformationEngine;
use crate::validation::evaluator::PolicyEvaluator;
use crate::validation::state::ValidationStatus;
use crate::validation::types::{score_map, DocumentPolicyValidation, QueryScore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Repositories a run reads from and writes to
#[derive(Clone)]
pub struct PipelineStores {
    pub documents: Arc<dyn DocumentStore>,
    pub policies: Arc<dyn PolicyStore>,
    pub queries: Arc<dyn QueryStore>,
    pub services: Arc<dyn ServiceConfigStore>,
    pub records: Arc<dyn ValidationRecordStore>,
}

/// Which score list a validation pass fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScorePhase {
    Initial,
    PostTransform,
}

/// Document policy validation orchestrator
///
/// Holds no per-run state; concurrent runs share only the injected stores,
/// client and telemetry.
pub struct ValidationOrchestrator {
    documents: Arc<dyn DocumentStore>,
    policies: Arc<dyn PolicyStore>,
    queries: Arc<dyn QueryStore>,
    records: Arc<dyn ValidationRecordStore>,
    gateway: QueryGateway,
    transformer: TransformationEngine,
    evaluator: PolicyEvaluator,
    score_parser: ScoreParser,
    clock: Arc<dyn Clock>,
    telemetry: ValidationTelemetry,
}

impl ValidationOrchestrator {
    /// Create orchestrator with the system clock and fresh telemetry
    pub fn new(stores: PipelineStores, client: Arc<dyn KnowledgeServiceClient>) -> Self {
        let gateway = QueryGateway::new(client, stores.services.clone());
        let transformer = TransformationEngine::new(gateway.clone(), stores.documents.clone());

        Self {
            documents: stores.documents,
            policies: stores.policies,
            queries: stores.queries,
            records: stores.records,
            gateway,
            transformer,
            evaluator: PolicyEvaluator::new(),
            score_parser: ScoreParser::new(),
            clock: Arc::new(SystemClock),
            telemetry: ValidationTelemetry::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_telemetry(mut self, telemetry: ValidationTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn telemetry(&self) -> &ValidationTelemetry {
        &self.telemetry
    }

    /// Validate a document against a policy
    ///
    /// Returns the terminal PASSED or FAILED record. On error the record is
    /// left in ERROR in the record store and the error is returned.
    pub async fn validate(
        &self,
        document_id: &str,
        policy_id: &str,
    ) -> Result<DocumentPolicyValidation> {
        if document_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput("document_id is empty".to_string()));
        }
        if policy_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput("policy_id is empty".to_string()));
        }

        let validation_id = self.records.generate_id().await?;
        let span = info_span!(
            "validation_run",
            validation_id = %validation_id,
            document_id = %document_id,
            policy_id = %policy_id
        );

        self.run(validation_id, document_id, policy_id)
            .instrument(span)
            .await
    }

    /// Read back a validation record
    pub async fn get_validation(&self, validation_id: &str) -> Result<DocumentPolicyValidation> {
        self.records.get(validation_id).await
    }

    async fn run(
        &self,
        validation_id: String,
        document_id: &str,
        policy_id: &str,
    ) -> Result<DocumentPolicyValidation> {
        let mut record =
            DocumentPolicyValidation::new(validation_id, document_id, policy_id, self.clock.now());
        self.records.save(&record).await?;

        self.telemetry.record(TelemetryEvent::RunStarted {
            validation_id: record.validation_id.clone(),
            timestamp: Instant::now(),
        });
        info!("validation run started");

        let mut held = Vec::new();
        let outcome = self.execute(&mut record, &mut held).await;
        for registrations in &held {
            self.gateway.release(registrations).await;
        }

        match outcome {
            Ok(()) => {
                info!(status = %record.status, "validation run finished");
                self.finish_telemetry(&record);
                Ok(record)
            }
            Err(err) => {
                self.record_error(&mut record, &err).await;
                self.finish_telemetry(&record);
                Err(err)
            }
        }
    }

    /// Everything after the initial save; every error surfaces here
    ///
    /// Every registration set created here is pushed onto `held`.
    async fn execute(
        &self,
        record: &mut DocumentPolicyValidation,
        held: &mut Vec<Registrations>,
    ) -> Result<()> {
        let document = self.documents.get(&record.input_document_id).await?;
        let policy = self.policies.get(&record.policy_id).await?;
        policy.validate()?;

        self.advance(record, ValidationStatus::InProgress).await?;

        let queries = self.resolve_queries(&policy).await?;
        let services = service_ids(&policy, &queries)?;
        let registrations = self.register(record, &services, &document).await?;
        held.push(registrations.clone());

        self.score(record, &policy, &queries, &registrations, ScorePhase::Initial)
            .await?;
        self.advance(record, ValidationStatus::ValidationComplete).await?;

        let initial_passed = self.decide(&policy, &record.validation_scores);
        if initial_passed || !policy.has_transformations() {
            return self.finish(record, initial_passed).await;
        }

        self.advance(record, ValidationStatus::TransformationRequired).await?;
        self.advance(record, ValidationStatus::TransformationInProgress).await?;

        let transformation_queries = policy
            .transformation_queries
            .iter()
            .map(|id| lookup(&queries, id).cloned())
            .collect::<Result<Vec<_>>>()?;
        let transformed = self
            .transformer
            .transform(&document, &transformation_queries, &registrations)
            .await?;

        record.set_transformed_document(transformed.id.clone())?;
        self.telemetry.record(TelemetryEvent::TransformationProduced {
            validation_id: record.validation_id.clone(),
            document_id: transformed.id.clone(),
            timestamp: Instant::now(),
        });
        self.advance(record, ValidationStatus::TransformationComplete).await?;

        let transformed_registrations = self
            .gateway
            .register_like(&registrations, &transformed)
            .await?;
        held.push(transformed_registrations.clone());
        self.note_registrations(record, &transformed_registrations);

        self.advance(record, ValidationStatus::InProgress).await?;
        self.score(
            record,
            &policy,
            &queries,
            &transformed_registrations,
            ScorePhase::PostTransform,
        )
        .await?;

        let final_passed = self.decide(&policy, record.final_scores());
        self.finish(record, final_passed).await
    }

    /// Fetch every query the policy references; any missing id fails the run
    async fn resolve_queries(&self, policy: &Policy) -> Result<HashMap<String, KnowledgeServiceQuery>> {
        let mut queries = HashMap::new();
        for query_id in policy.referenced_query_ids() {
            let query = self.queries.get(query_id).await?;
            queries.insert(query_id.to_string(), query);
        }
        debug!(count = queries.len(), "queries resolved");
        Ok(queries)
    }

    async fn register(
        &self,
        record: &DocumentPolicyValidation,
        service_ids: &[&str],
        document: &Document,
    ) -> Result<Registrations> {
        let registrations = self
            .gateway
            .register_for_services(service_ids.iter().copied(), document)
            .await?;
        self.note_registrations(record, &registrations);
        Ok(registrations)
    }

    /// Run the validation queries in declaration order, recording each score
    async fn score(
        &self,
        record: &mut DocumentPolicyValidation,
        policy: &Policy,
        queries: &HashMap<String, KnowledgeServiceQuery>,
        registrations: &Registrations,
        phase: ScorePhase,
    ) -> Result<()> {
        for requirement in &policy.validation_scores {
            let query = lookup(queries, &requirement.query_id)?;
            let result = self.gateway.execute_registered(query, registrations).await?;
            let score = self.score_parser.parse(&result)?;

            self.telemetry.record(TelemetryEvent::QueryExecuted {
                validation_id: record.validation_id.clone(),
                query_id: query.query_id.clone(),
                duration_ms: result.duration_ms,
                timestamp: Instant::now(),
            });
            debug!(
                query_id = %query.query_id,
                score,
                required = requirement.required_score,
                phase = ?phase,
                "score recorded"
            );

            let entry = QueryScore::new(query.query_id.clone(), score);
            match phase {
                ScorePhase::Initial => record.add_validation_score(entry)?,
                ScorePhase::PostTransform => record.add_post_transform_score(entry)?,
            }
        }
        Ok(())
    }

    fn decide(&self, policy: &Policy, scores: &[QueryScore]) -> bool {
        let actual = score_map(scores);
        let passed = self.evaluator.evaluate(&actual, &policy.validation_scores);
        if !passed {
            for missed in self.evaluator.failing_criteria(&actual, &policy.validation_scores) {
                debug!(
                    query_id = %missed.query_id,
                    actual = actual.get(&missed.query_id).copied().unwrap_or(0),
                    required = missed.required_score,
                    "requirement not met"
                );
            }
        }
        passed
    }

    /// Move to `next` and persist
    async fn advance(
        &self,
        record: &mut DocumentPolicyValidation,
        next: ValidationStatus,
    ) -> Result<()> {
        let from = record.status;
        record.transition_to(next)?;
        self.note_transition(record, from);
        self.records.save(record).await
    }

    /// Complete the run; the in-memory record only turns terminal once saved
    async fn finish(&self, record: &mut DocumentPolicyValidation, passed: bool) -> Result<()> {
        let mut finished = record.clone();
        finished.complete(passed, self.clock.now())?;
        self.records.save(&finished).await?;

        let from = record.status;
        *record = finished;
        self.note_transition(record, from);
        Ok(())
    }

    /// Move the record to ERROR and persist it; failures here are only logged
    async fn record_error(&self, record: &mut DocumentPolicyValidation, err: &PipelineError) {
        error!(error = %err, status = %record.status, "validation run failed");

        let from = record.status;
        if let Err(mark_err) = record.fail(err.to_string(), self.clock.now()) {
            warn!(error = %mark_err, "could not mark validation as errored");
            return;
        }
        self.note_transition(record, from);

        if let Err(save_err) = self.records.save(record).await {
            error!(error = %save_err, "could not persist errored validation");
        }
    }

    fn note_transition(&self, record: &DocumentPolicyValidation, from: ValidationStatus) {
        debug!(from = %from, to = %record.status, "status changed");
        self.telemetry.record(TelemetryEvent::StatusTransition {
            validation_id: record.validation_id.clone(),
            from,
            to: record.status,
            timestamp: Instant::now(),
        });
    }

    fn note_registrations(&self, record: &DocumentPolicyValidation, registrations: &Registrations) {
        for config in registrations.service_configs() {
            self.telemetry.record(TelemetryEvent::DocumentRegistered {
                validation_id: record.validation_id.clone(),
                document_id: registrations.document_id().to_string(),
                service_id: config.service_id.clone(),
                timestamp: Instant::now(),
            });
        }
    }

    fn finish_telemetry(&self, record: &DocumentPolicyValidation) {
        self.telemetry.record(TelemetryEvent::RunFinished {
            validation_id: record.validation_id.clone(),
            status: record.status,
            timestamp: Instant::now(),
        });
    }
}

fn lookup<'a>(
    queries: &'a HashMap<String, KnowledgeServiceQuery>,
    query_id: &str,
) -> Result<&'a KnowledgeServiceQuery> {
    queries
        .get(query_id)
        .ok_or_else(|| PipelineError::not_found("KnowledgeServiceQuery", query_id))
}

/// Distinct service ids in the order the policy first references them
fn service_ids<'a>(
    policy: &Policy,
    queries: &'a HashMap<String, KnowledgeServiceQuery>,
) -> Result<Vec<&'a str>> {
    let mut ids: Vec<&str> = Vec::new();
    for query_id in policy.referenced_query_ids() {
        let service_id = lookup(queries, query_id)?.knowledge_service_id.as_str();
        if !ids.contains(&service_id) {
            ids.push(service_id);
        }
    }
    Ok(ids)
}
