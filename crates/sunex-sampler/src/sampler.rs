use std::fmt;

use async_trait::async_trait;
use sunex_schemas::CounterSample;

/// Errors a [`Sampler`] implementation may return.
#[derive(Debug)]
pub enum SamplerError {
    /// Connectivity or protocol failure while talking to the device.
    Transport(String),
    /// A response payload could not be decoded into a counter reading.
    Decode(String),
    /// A required configuration value is missing or invalid.
    Config(String),
}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerError::Transport(msg) => write!(f, "transport error: {msg}"),
            SamplerError::Decode(msg) => write!(f, "decode error: {msg}"),
            SamplerError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for SamplerError {}

/// Produces one raw reading of a named, monotonically non-decreasing
/// physical counter.
///
/// Device identity is injected at construction. A successful sample never
/// carries a negative value from a well-behaved implementation; the
/// reconciler still defends against it.
///
/// Implementations must be object-safe and `Send + Sync` so callers can hold
/// a `Box<dyn Sampler>` across task boundaries.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Human-readable name identifying this sampler (e.g. `"http-bridge"`).
    fn name(&self) -> &'static str;

    async fn sample(&self) -> Result<CounterSample, SamplerError>;
}
