use sunex_schemas::{Checkpoint, CounterSample};

use crate::{Decision, PlausibilityLimits, RejectKind, Rejection};

/// Deterministic reconciliation of one fresh sample against the previous
/// checkpoint:
/// - negative or non-finite raw value => MALFORMED_SAMPLE
/// - no baseline for this counter name => accept (bootstrap)
/// - counter decreased => COUNTER_REGRESSED
/// - increase beyond the configured bound => IMPLAUSIBLE_JUMP
/// - otherwise => accept
///
/// Pure function: same inputs always yield the same decision, and `previous`
/// is never mutated. Committing the new checkpoint is the caller's job, after
/// the record append succeeded.
pub fn reconcile(
    previous: &Checkpoint,
    sample: &CounterSample,
    limits: &PlausibilityLimits,
) -> Decision {
    // Hard input error, checked before the bootstrap rule: a cumulative
    // counter can never legitimately read negative, and NaN/inf means the
    // transport handed us garbage.
    if !sample.value.is_finite() || sample.value < 0.0 {
        return Decision::Rejected(Rejection {
            kind: RejectKind::MalformedSample,
            details: format!(
                "raw reading for '{}' is {} {}; expected a finite non-negative value",
                sample.name, sample.value, sample.unit
            ),
        });
    }

    let previous_value = match previous.value_for(&sample.name) {
        // First observation for this counter: no baseline to compare against.
        None => {
            return Decision::Accepted {
                sample: sample.clone(),
            }
        }
        Some(v) => v,
    };

    let delta = sample.value - previous_value;

    if delta < 0.0 {
        return Decision::Rejected(Rejection {
            kind: RejectKind::CounterRegressed,
            details: format!(
                "counter '{}' regressed from {} to {} {}",
                sample.name, previous_value, sample.value, sample.unit
            ),
        });
    }

    if delta > limits.max_delta {
        return Decision::Rejected(Rejection {
            kind: RejectKind::ImplausibleJump,
            details: format!(
                "increase for '{}' is {} {}, more than the allowed {} {} per {}s window",
                sample.name,
                delta,
                sample.unit,
                limits.max_delta,
                sample.unit,
                limits.window.as_secs()
            ),
        });
    }

    Decision::Accepted {
        sample: sample.clone(),
    }
}
