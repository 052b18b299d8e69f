use std::time::Duration;

use serde::{Deserialize, Serialize};
use sunex_schemas::CounterSample;

/// Caller-supplied plausibility bound for one sampling interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityLimits {
    /// Maximum physically plausible increase over one sampling interval,
    /// in the counter's unit (e.g. 10_000.0 Wh for an hourly schedule).
    pub max_delta: f64,

    /// The sampling interval the bound is calibrated for. Carried into
    /// rejection evidence; does not scale the bound at decision time.
    pub window: Duration,
}

impl PlausibilityLimits {
    pub fn new(max_delta: f64, window: Duration) -> Self {
        Self { max_delta, window }
    }
}

/// Why a sample was dropped. Stable operator-facing codes via [`as_str`].
///
/// [`as_str`]: RejectKind::as_str
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectKind {
    /// Negative or non-finite raw value: a transport fault, not a
    /// plausibility concern.
    MalformedSample,
    /// The counter decreased. Device reset, register misread, or corruption;
    /// the true value cannot be inferred, so the sample is dropped.
    CounterRegressed,
    /// The increase exceeds the configured plausible maximum. Guards against
    /// a single corrupted read (e.g. a garbled high-order byte).
    ImplausibleJump,
}

impl RejectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectKind::MalformedSample => "MALFORMED_SAMPLE",
            RejectKind::CounterRegressed => "COUNTER_REGRESSED",
            RejectKind::ImplausibleJump => "IMPLAUSIBLE_JUMP",
        }
    }
}

/// Rejection with human-readable evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectKind,
    pub details: String,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.details)
    }
}

impl std::error::Error for Rejection {}

/// Outcome of reconciling one sample against the previous checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The sample is a trustworthy continuation of the checkpoint.
    Accepted { sample: CounterSample },
    /// The sample is dropped; the caller must not persist it nor advance
    /// the checkpoint.
    Rejected(Rejection),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted { .. })
    }

    pub fn accepted_sample(&self) -> Option<&CounterSample> {
        match self {
            Decision::Accepted { sample } => Some(sample),
            Decision::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Decision::Accepted { .. } => None,
            Decision::Rejected(r) => Some(r),
        }
    }
}
