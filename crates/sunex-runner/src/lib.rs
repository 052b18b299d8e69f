//! One-shot run orchestration.
//!
//! Sequencing invariant: the new checkpoint is written only after the
//! recorder acknowledged the append. A recorder failure leaves the
//! checkpoint untouched, so the next run reconciles against the same
//! baseline. A checkpoint-save failure after a successful append terminates
//! the run in error; the next run may then append a duplicate record, which
//! is the accepted tradeoff (the store is append-only and a duplicate is a
//! detectable artifact, a lost checkpoint update would not recur).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sunex_checkpoint::{CheckpointStore, CheckpointStoreError};
use sunex_db::{Recorder, RecorderError};
use sunex_reconcile::{reconcile, Decision, PlausibilityLimits, Rejection};
use sunex_sampler::{Sampler, SamplerError};
use sunex_schemas::{Checkpoint, MeasurementRecord};
use tracing::{debug, info, warn};

/// Terminal outcome of a failed run. Every variant maps to one stable
/// operator-facing code via [`code`]; the run is never retried internally.
///
/// [`code`]: RunError::code
#[derive(Debug)]
pub enum RunError {
    Sampler(SamplerError),
    Rejected(Rejection),
    Recorder(RecorderError),
    Checkpoint(CheckpointStoreError),
}

impl RunError {
    pub fn code(&self) -> &'static str {
        match self {
            RunError::Sampler(_) => "TRANSPORT_ERROR",
            RunError::Rejected(r) => r.kind.as_str(),
            RunError::Recorder(RecorderError::SchemaMismatch(_)) => "SCHEMA_MISMATCH",
            RunError::Recorder(RecorderError::Unavailable(_)) => "STORE_UNAVAILABLE",
            RunError::Checkpoint(CheckpointStoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Sampler(e) => write!(f, "{}: {e}", self.code()),
            RunError::Rejected(r) => write!(f, "{}: {}", self.code(), r.details),
            RunError::Recorder(e) => write!(f, "{}: {e}", self.code()),
            RunError::Checkpoint(e) => write!(f, "{}: {e}", self.code()),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Sampler(e) => Some(e),
            RunError::Rejected(r) => Some(r),
            RunError::Recorder(e) => Some(e),
            RunError::Checkpoint(e) => Some(e),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub counter_name: String,
    pub value: f64,
    /// Increase over the previous checkpoint; `None` on the first-ever
    /// observation of this counter.
    pub delta: Option<f64>,
    pub readings_stored: usize,
    pub inserted_at: DateTime<Utc>,
    pub recorder: String,
}

/// Sequences one load -> sample -> reconcile -> record -> checkpoint pipeline.
/// All collaborators and limits are injected at construction.
pub struct Runner {
    sampler: Box<dyn Sampler>,
    checkpoints: Box<dyn CheckpointStore>,
    recorder: Box<dyn Recorder>,
    limits: PlausibilityLimits,
}

impl Runner {
    pub fn new(
        sampler: Box<dyn Sampler>,
        checkpoints: Box<dyn CheckpointStore>,
        recorder: Box<dyn Recorder>,
        limits: PlausibilityLimits,
    ) -> Self {
        Self {
            sampler,
            checkpoints,
            recorder,
            limits,
        }
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let (previous, found) = self.checkpoints.load().map_err(RunError::Checkpoint)?;
        if found {
            debug!(counters = previous.len(), "loaded previous checkpoint");
        } else {
            info!("no previous checkpoint, first run for this store");
        }

        let sample = self.sampler.sample().await.map_err(RunError::Sampler)?;
        info!(
            counter = %sample.name,
            value = sample.value,
            unit = %sample.unit,
            sampler = self.sampler.name(),
            "sampled counter"
        );

        let sample = match reconcile(&previous, &sample, &self.limits) {
            Decision::Accepted { sample } => sample,
            Decision::Rejected(rejection) => {
                warn!(code = rejection.kind.as_str(), details = %rejection.details, "sample rejected");
                return Err(RunError::Rejected(rejection));
            }
        };

        let delta = previous.value_for(&sample.name).map(|p| sample.value - p);

        let record = MeasurementRecord {
            readings: vec![sample],
            inserted_at: Utc::now(),
        };
        self.recorder
            .append(&record)
            .await
            .map_err(RunError::Recorder)?;

        let next = Checkpoint::from_readings(&record.readings);
        if let Err(e) = self.checkpoints.save(&next) {
            // The record is already appended; the next run reconciles against
            // the old baseline and may append a duplicate.
            warn!(error = %e, "checkpoint save failed after a successful append");
            return Err(RunError::Checkpoint(e));
        }

        let reading = &record.readings[0];
        info!(
            counter = %reading.name,
            value = reading.value,
            readings = record.readings.len(),
            "stored readings and advanced checkpoint"
        );

        Ok(RunReport {
            counter_name: reading.name.clone(),
            value: reading.value,
            delta,
            readings_stored: record.readings.len(),
            inserted_at: record.inserted_at,
            recorder: self.recorder.name().to_string(),
        })
    }
}
