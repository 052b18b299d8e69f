//! Sampler boundary for inverter counter readings.
//!
//! This crate defines the sampler trait, its error taxonomy, and one
//! concrete implementation that reads the counter from a local HTTP/JSON
//! register bridge. The inverter's own wire protocol (socket handling,
//! register addressing, binary framing) stays outside this repository.

mod bridge;
mod sampler;

pub use bridge::{BridgeConfig, HttpBridgeSampler};
pub use sampler::{Sampler, SamplerError};
