//! sunex-reconcile
//!
//! Measurement reconciliation engine.
//!
//! Architectural decisions:
//! - First observation for a counter name is accepted unconditionally
//! - A cumulative counter must never decrease; regression drops the sample
//! - A single implausible jump is rejected rather than corrected
//! - The plausibility bound is caller-supplied configuration
//!
//! Deterministic, pure logic. No IO. No clocks. No store calls.

mod engine;
mod types;

pub use engine::reconcile;
pub use types::*;
