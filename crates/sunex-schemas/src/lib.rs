use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw reading of a named, monotonically non-decreasing physical counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSample {
    /// Stable identifier of the physical quantity (e.g. "Sunny TriPower 8.0").
    pub name: String,
    /// Raw counter value at sample time. Non-negative under normal operation.
    pub value: f64,
    /// Unit of measure (e.g. "Wh").
    pub unit: String,
}

impl CounterSample {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
        }
    }
}

/// Immutable fact appended to the analytical store. Never edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Samples accepted in this run, in collection order.
    pub readings: Vec<CounterSample>,
    /// Commit timestamp, set once at append time.
    pub inserted_at: DateTime<Utc>,
}

/// Last accepted value per counter name, used as the baseline for the next
/// run's plausibility checks.
///
/// Serializes transparently as a flat JSON object `{ "<name>": <value> }`;
/// an empty or absent document is the empty mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(BTreeMap<String, f64>);

impl Checkpoint {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Rebuild the checkpoint from a run's accepted readings. The checkpoint
    /// is replaced wholesale; counters not present in `readings` are dropped.
    pub fn from_readings(readings: &[CounterSample]) -> Self {
        let mut map = BTreeMap::new();
        for r in readings {
            map.insert(r.name.clone(), r.value);
        }
        Self(map)
    }

    pub fn value_for(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn counters(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
