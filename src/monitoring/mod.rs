//! Sensor sampling, safe-range classification and energy accounting.
//!
//! This module holds the pure core of the monitor: simulated readings, the
//! inclusive range checks that turn them into channel and pipeline verdicts,
//! and the renewable-offset ledger for profiles that meter pump energy.

pub mod classifier;
pub mod data;
pub mod energy;
pub mod sampler;
pub mod traits;

// Re-export commonly used items
pub use classifier::{assess, classify, classify_channel};
pub use data::{
    Assessment, Channel, ChannelAssessment, ChannelRange, ChannelStatus, PipelineStatus, Reading,
    SafeRange, SafeRanges,
};
pub use energy::{EnergyLedger, EnergySample, RenewableGeneration};
pub use sampler::{ProfileKind, SamplerProfile, SensorSampler};
pub use traits::ReadingSource;
