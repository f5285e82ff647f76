//! Telemetry for validation runs
//!
//! Two layers: `tracing` for structured log output, and an in-process
//! [`ValidationTelemetry`] collector that keeps run events and counters for
//! callers that want to inspect what a run did.

use crate::config::LoggingConfig;
use crate::errors::{PipelineError, Result};
use crate::validation::ValidationStatus;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` overrides the configured level when present.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| PipelineError::ConfigError(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| PipelineError::ConfigError(format!("Logging already initialized: {}", e)))
}

/// Events kept by a default collector; older events are dropped first
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    RunStarted {
        validation_id: String,
        timestamp: Instant,
    },
    StatusTransition {
        validation_id: String,
        from: ValidationStatus,
        to: ValidationStatus,
        timestamp: Instant,
    },
    DocumentRegistered {
        validation_id: String,
        document_id: String,
        service_id: String,
        timestamp: Instant,
    },
    QueryExecuted {
        validation_id: String,
        query_id: String,
        duration_ms: u64,
        timestamp: Instant,
    },
    TransformationProduced {
        validation_id: String,
        document_id: String,
        timestamp: Instant,
    },
    RunFinished {
        validation_id: String,
        status: ValidationStatus,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub runs_started: usize,
    pub runs_passed: usize,
    pub runs_failed: usize,
    pub runs_errored: usize,
    pub status_transitions: usize,
    pub registrations: usize,
    pub queries_executed: usize,
    pub transformations: usize,
}

/// Telemetry collector, cheap to clone and share between runs
///
/// Counters cover every event ever recorded; the event log itself is a
/// ring of at most `max_events` entries.
#[derive(Clone)]
pub struct ValidationTelemetry {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    max_events: usize,
    start_time: Instant,
}

impl ValidationTelemetry {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self::with_max_events(DEFAULT_MAX_EVENTS)
    }

    /// Create a collector that keeps at most `max_events` events (minimum 1)
    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            max_events: max_events.max(1),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::RunStarted { .. } => stats.runs_started += 1,
                TelemetryEvent::StatusTransition { .. } => stats.status_transitions += 1,
                TelemetryEvent::DocumentRegistered { .. } => stats.registrations += 1,
                TelemetryEvent::QueryExecuted { .. } => stats.queries_executed += 1,
                TelemetryEvent::TransformationProduced { .. } => stats.transformations += 1,
                TelemetryEvent::RunFinished { status, .. } => match status {
                    ValidationStatus::Passed => stats.runs_passed += 1,
                    ValidationStatus::Failed => stats.runs_failed += 1,
                    _ => stats.runs_errored += 1,
                },
            }
        }

        let mut events = lock(&self.events);
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Status transitions recorded for one run, in order
    pub fn transitions_for(&self, validation_id: &str) -> Vec<(ValidationStatus, ValidationStatus)> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::StatusTransition {
                    validation_id: id,
                    from,
                    to,
                    ..
                } if id == validation_id => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// Fraction of finished runs that passed
    pub fn pass_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        let total = stats.runs_passed + stats.runs_failed + stats.runs_errored;
        if total == 0 {
            0.0
        } else {
            stats.runs_passed as f64 / total as f64
        }
    }
}

impl Default for ValidationTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

// a panic while recording must not disable telemetry for other runs
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
