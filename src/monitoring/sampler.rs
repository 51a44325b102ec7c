//! Simulated pipeline sensors.

use crate::error::{MonitorError, Result};
use crate::monitoring::data::{Channel, Reading};
use crate::monitoring::energy::RenewableGeneration;
use crate::monitoring::traits::ReadingSource;
use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Uniform sampling bounds for one channel (both ends inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBounds {
    pub channel: Channel,
    pub low: f64,
    pub high: f64,
}

/// Uniform bounds for on-site solar and wind generation per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenewableBounds {
    pub solar_kwh: (f64, f64),
    pub wind_kwh: (f64, f64),
}

/// Named simulation profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Low-pressure gas line
    #[default]
    Standard,
    /// High-pressure oil trunk line with metered pump energy
    OilTransmission,
    /// Water line watched for leaks through pressure and flow
    LeakDetection,
}

/// What the sampler draws, and from which bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerProfile {
    pub channels: Vec<ChannelBounds>,
    pub renewables: Option<RenewableBounds>,
}

impl SamplerProfile {
    /// Profile for a named kind.
    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Standard => Self::standard(),
            ProfileKind::OilTransmission => Self::oil_transmission(),
            ProfileKind::LeakDetection => Self::leak_detection(),
        }
    }

    pub fn standard() -> Self {
        Self {
            channels: vec![
                bounds(Channel::Pressure, 50.0, 100.0),
                bounds(Channel::Vibration, 0.0, 10.0),
                bounds(Channel::Temperature, -10.0, 50.0),
            ],
            renewables: None,
        }
    }

    pub fn oil_transmission() -> Self {
        Self {
            channels: vec![
                bounds(Channel::Pressure, 600.0, 2000.0),
                bounds(Channel::Vibration, 0.0, 10.0),
                bounds(Channel::Temperature, -10.0, 50.0),
                bounds(Channel::Energy, 50.0, 150.0),
            ],
            renewables: Some(RenewableBounds {
                solar_kwh: (10.0, 50.0),
                wind_kwh: (10.0, 50.0),
            }),
        }
    }

    /// Pressure and flow for leak checks. Temperature is 60-90 °F.
    pub fn leak_detection() -> Self {
        Self {
            channels: vec![
                bounds(Channel::Pressure, 50.0, 100.0),
                bounds(Channel::FlowRate, 200.0, 300.0),
                bounds(Channel::Temperature, 15.5, 32.0),
            ],
            renewables: None,
        }
    }

    /// Reject bounds the uniform distribution cannot sample.
    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(self.channels.len());
        for b in &self.channels {
            check_bounds(b.channel.name(), b.low, b.high)?;
            if seen.contains(&b.channel) {
                return Err(MonitorError::config_error(format!(
                    "sampler bounds for {} declared twice",
                    b.channel
                )));
            }
            seen.push(b.channel);
        }
        if let Some(r) = &self.renewables {
            check_bounds("solar", r.solar_kwh.0, r.solar_kwh.1)?;
            check_bounds("wind", r.wind_kwh.0, r.wind_kwh.1)?;
        }
        Ok(())
    }
}

fn bounds(channel: Channel, low: f64, high: f64) -> ChannelBounds {
    ChannelBounds { channel, low, high }
}

fn check_bounds(name: &str, low: f64, high: f64) -> Result<()> {
    if !low.is_finite() || !high.is_finite() || low > high {
        return Err(MonitorError::config_error(format!(
            "invalid sampler bounds for {}: [{}, {}]",
            name, low, high
        )));
    }
    // Finite bounds can still span more than an f64 can hold.
    Uniform::new_inclusive(low, high).map_err(|e| {
        MonitorError::config_error(format!(
            "sampler bounds for {} cannot be sampled: [{}, {}] ({})",
            name, low, high, e
        ))
    })?;
    Ok(())
}

/// Random sensor data generator.
///
/// Holds nothing but its bounds and RNG, so successive samples are
/// independent.
pub struct SensorSampler {
    profile: SamplerProfile,
    rng: StdRng,
}

impl SensorSampler {
    /// Create a sampler seeded from the operating system.
    pub fn new(profile: SamplerProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Create a reproducible sampler.
    pub fn with_seed(profile: SamplerProfile, seed: u64) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn profile(&self) -> &SamplerProfile {
        &self.profile
    }

    /// Draw one reading. `sequence` is left at 0 for the session to assign.
    pub fn sample(&mut self) -> Reading {
        let rng = &mut self.rng;
        let values: Vec<(Channel, f64)> = self
            .profile
            .channels
            .iter()
            .map(|b| (b.channel, rng.random_range(b.low..=b.high)))
            .collect();
        Reading::new(0, values)
    }

    /// Draw renewable generation for a tick, if the profile meters it.
    pub fn sample_renewables(&mut self) -> Option<RenewableGeneration> {
        let bounds = self.profile.renewables?;
        Some(RenewableGeneration {
            solar_kwh: self
                .rng
                .random_range(bounds.solar_kwh.0..=bounds.solar_kwh.1),
            wind_kwh: self.rng.random_range(bounds.wind_kwh.0..=bounds.wind_kwh.1),
        })
    }
}

impl ReadingSource for SensorSampler {
    fn next_reading(&mut self) -> Reading {
        self.sample()
    }

    fn renewables(&mut self) -> Option<RenewableGeneration> {
        self.sample_renewables()
    }
}
