//! In-memory collaborator doubles for runner scenarios. All doubles are
//! cheaply cloneable so a test can keep a handle to the state it hands the
//! runner.

// Each scenario target compiles this module separately and uses a subset.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sunex_checkpoint::{CheckpointStore, CheckpointStoreError};
use sunex_db::{Recorder, RecorderError};
use sunex_sampler::{Sampler, SamplerError};
use sunex_schemas::{Checkpoint, CounterSample, MeasurementRecord};

/// Sampler returning one fixed reading.
#[derive(Clone)]
pub struct FixedSampler {
    reading: CounterSample,
}

impl FixedSampler {
    pub fn reading(name: &str, value: f64) -> Self {
        Self {
            reading: CounterSample::new(name, value, "Wh"),
        }
    }
}

#[async_trait]
impl Sampler for FixedSampler {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn sample(&self) -> Result<CounterSample, SamplerError> {
        Ok(self.reading.clone())
    }
}

/// Checkpoint store over a shared in-memory document, with a save kill
/// switch for partial-failure scenarios.
#[derive(Clone)]
pub struct MemCheckpointStore {
    state: Arc<Mutex<Option<Checkpoint>>>,
    fail_save: bool,
}

impl MemCheckpointStore {
    pub fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
            fail_save: false,
        }
    }

    pub fn with_counter(name: &str, value: f64) -> Self {
        let mut cp = Checkpoint::empty();
        cp.insert(name, value);
        Self {
            state: Arc::new(Mutex::new(Some(cp))),
            fail_save: false,
        }
    }

    pub fn failing_save(name: &str, value: f64) -> Self {
        let mut store = Self::with_counter(name, value);
        store.fail_save = true;
        store
    }

    pub fn current(&self) -> Option<Checkpoint> {
        self.state.lock().unwrap().clone()
    }
}

impl CheckpointStore for MemCheckpointStore {
    fn load(&self) -> Result<(Checkpoint, bool), CheckpointStoreError> {
        match self.state.lock().unwrap().clone() {
            Some(cp) => Ok((cp, true)),
            None => Ok((Checkpoint::empty(), false)),
        }
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointStoreError> {
        if self.fail_save {
            return Err(CheckpointStoreError::Unavailable(
                "simulated save failure".to_string(),
            ));
        }
        *self.state.lock().unwrap() = Some(checkpoint.clone());
        Ok(())
    }
}

/// Recorder collecting appended records, with an availability kill switch.
#[derive(Clone)]
pub struct CollectingRecorder {
    records: Arc<Mutex<Vec<MeasurementRecord>>>,
    fail_unavailable: bool,
}

impl CollectingRecorder {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            fail_unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail_unavailable: true,
            ..Self::new()
        }
    }

    pub fn appended(&self) -> Vec<MeasurementRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recorder for CollectingRecorder {
    fn name(&self) -> &'static str {
        "collecting"
    }

    async fn append(&self, record: &MeasurementRecord) -> Result<(), RecorderError> {
        if self.fail_unavailable {
            return Err(RecorderError::Unavailable("simulated outage".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
