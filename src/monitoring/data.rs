//! Data structures for sensor readings, safe ranges and verdicts.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A sensor channel on the monitored pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Line pressure in psi
    Pressure,
    /// Vibration level (dimensionless)
    Vibration,
    /// Fluid temperature in Celsius
    Temperature,
    /// Pump energy consumed during the tick in kWh
    Energy,
    /// Product flow in US gallons per minute
    FlowRate,
}

impl Channel {
    /// Every channel, in declaration order.
    pub const ALL: [Channel; 5] = [
        Channel::Pressure,
        Channel::Vibration,
        Channel::Temperature,
        Channel::Energy,
        Channel::FlowRate,
    ];

    /// Stable machine name (matches the serde representation).
    pub fn name(self) -> &'static str {
        match self {
            Channel::Pressure => "pressure",
            Channel::Vibration => "vibration",
            Channel::Temperature => "temperature",
            Channel::Energy => "energy",
            Channel::FlowRate => "flow_rate",
        }
    }

    /// Human-readable label used in prompts and dashboards.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Pressure => "pressure",
            Channel::Vibration => "vibration level",
            Channel::Temperature => "temperature",
            Channel::Energy => "pump energy consumption",
            Channel::FlowRate => "flow rate",
        }
    }

    /// Unit suffix, if the channel has one.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            Channel::Pressure => Some("psi"),
            Channel::Vibration => None,
            Channel::Temperature => Some("°C"),
            Channel::Energy => Some("kWh"),
            Channel::FlowRate => Some("gal/min"),
        }
    }

    /// Parse a channel from its machine name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One set of channel values produced by a single sampling tick.
///
/// Readings are immutable once built; the tick that produced one owns it and
/// hands out clones to the history and to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Position of this reading within its session (starts at 1)
    pub sequence: u64,
    /// Timestamp when this reading was taken (Unix timestamp in milliseconds)
    pub timestamp: u64,
    /// Channel values
    values: BTreeMap<Channel, f64>,
}

impl Reading {
    /// Create a reading stamped with the current time.
    pub fn new(sequence: u64, values: impl IntoIterator<Item = (Channel, f64)>) -> Self {
        Self::at(now_millis(), sequence, values)
    }

    /// Create a reading with an explicit timestamp.
    pub fn at(
        timestamp: u64,
        sequence: u64,
        values: impl IntoIterator<Item = (Channel, f64)>,
    ) -> Self {
        Self {
            sequence,
            timestamp,
            values: values.into_iter().collect(),
        }
    }

    /// Copy of this reading renumbered for a session.
    pub fn with_sequence(&self, sequence: u64) -> Self {
        Self {
            sequence,
            ..self.clone()
        }
    }

    /// Value of a channel, if it was sampled.
    pub fn get(&self, channel: Channel) -> Option<f64> {
        self.values.get(&channel).copied()
    }

    /// Iterate over the sampled channels in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f64)> + '_ {
        self.values.iter().map(|(c, v)| (*c, *v))
    }

    /// Number of sampled channels.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no channel was sampled.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Inclusive bounds considered safe for a channel.
///
/// A bound may be infinite for a one-sided check; in JSON an open bound is
/// `null` or absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeRange {
    #[serde(with = "lower_bound", default = "lower_bound::open")]
    pub min: f64,
    #[serde(with = "upper_bound", default = "upper_bound::open")]
    pub max: f64,
}

impl SafeRange {
    /// Range with only a lower bound.
    pub fn at_least(min: f64) -> Result<Self> {
        Self::new(min, f64::INFINITY)
    }

    /// Range with only an upper bound.
    pub fn at_most(max: f64) -> Result<Self> {
        Self::new(f64::NEG_INFINITY, max)
    }

    pub fn has_min(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_max(&self) -> bool {
        self.max.is_finite()
    }
}

macro_rules! open_bound {
    ($name:ident, $open:expr) => {
        mod $name {
            use serde::{Deserialize, Deserializer, Serializer};

            pub fn open() -> f64 {
                $open
            }

            pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                if value.is_infinite() {
                    serializer.serialize_none()
                } else {
                    serializer.serialize_f64(*value)
                }
            }

            pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
            where
                D: Deserializer<'de>,
            {
                Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or($open))
            }
        }
    };
}

open_bound!(lower_bound, f64::NEG_INFINITY);
open_bound!(upper_bound, f64::INFINITY);

impl SafeRange {
    /// Create a validated range.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Check `min <= max` with neither bound NaN.
    pub fn validate(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() {
            return Err(MonitorError::config_error(format!(
                "safe range bounds must be numbers, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min == f64::INFINITY || self.max == f64::NEG_INFINITY {
            return Err(MonitorError::config_error(format!(
                "safe range [{}, {}] admits no value",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(MonitorError::config_error(format!(
                "safe range minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Whether `value` lies inside the range (bounds included).
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// One configured channel range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub channel: Channel,
    #[serde(with = "lower_bound", default = "lower_bound::open")]
    pub min: f64,
    #[serde(with = "upper_bound", default = "upper_bound::open")]
    pub max: f64,
}

impl ChannelRange {
    pub fn range(&self) -> SafeRange {
        SafeRange {
            min: self.min,
            max: self.max,
        }
    }
}

/// Safe ranges for a session, in configuration-declared order.
///
/// The declared order is what prompts and dashboards follow, so it is kept
/// as a list rather than a map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeRanges {
    entries: Vec<ChannelRange>,
}

impl SafeRanges {
    /// An empty set of ranges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range, rejecting invalid bounds and duplicate channels.
    pub fn insert(&mut self, channel: Channel, range: SafeRange) -> Result<()> {
        range.validate()?;
        if self.get(channel).is_some() {
            return Err(MonitorError::config_error(format!(
                "safe range for {} declared twice",
                channel
            )));
        }
        self.entries.push(ChannelRange {
            channel,
            min: range.min,
            max: range.max,
        });
        Ok(())
    }

    /// Builder form of [`SafeRanges::insert`].
    pub fn with(mut self, channel: Channel, min: f64, max: f64) -> Result<Self> {
        self.insert(channel, SafeRange::new(min, max)?)?;
        Ok(self)
    }

    /// Range configured for a channel.
    pub fn get(&self, channel: Channel) -> Option<SafeRange> {
        self.entries
            .iter()
            .find(|entry| entry.channel == channel)
            .map(ChannelRange::range)
    }

    /// Iterate in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, SafeRange)> + '_ {
        self.entries.iter().map(|entry| (entry.channel, entry.range()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-check every entry. Needed for ranges that came in through serde.
    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            entry.range().validate().map_err(|e| match e {
                MonitorError::Configuration(msg) => {
                    MonitorError::config_error(format!("{}: {}", entry.channel, msg))
                }
                other => other,
            })?;
            if seen.contains(&entry.channel) {
                return Err(MonitorError::config_error(format!(
                    "safe range for {} declared twice",
                    entry.channel
                )));
            }
            seen.push(entry.channel);
        }
        Ok(())
    }

    /// Ranges used by the standard gas pipeline dashboard.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                ChannelRange {
                    channel: Channel::Pressure,
                    min: 50.0,
                    max: 100.0,
                },
                ChannelRange {
                    channel: Channel::Vibration,
                    min: 2.0,
                    max: 7.0,
                },
                ChannelRange {
                    channel: Channel::Temperature,
                    min: -5.0,
                    max: 40.0,
                },
            ],
        }
    }

    /// Ranges for a high-pressure oil transmission line.
    pub fn oil_transmission() -> Self {
        Self {
            entries: vec![
                ChannelRange {
                    channel: Channel::Pressure,
                    min: 600.0,
                    max: 2000.0,
                },
                ChannelRange {
                    channel: Channel::Vibration,
                    min: 2.0,
                    max: 7.0,
                },
                ChannelRange {
                    channel: Channel::Temperature,
                    min: -5.0,
                    max: 50.0,
                },
            ],
        }
    }
}

impl SafeRanges {
    /// Leak checks: low pressure or low flow means product is escaping.
    pub fn leak_detection() -> Self {
        Self {
            entries: vec![
                ChannelRange {
                    channel: Channel::Pressure,
                    min: 60.0,
                    max: f64::INFINITY,
                },
                ChannelRange {
                    channel: Channel::FlowRate,
                    min: 220.0,
                    max: f64::INFINITY,
                },
            ],
        }
    }
}

/// Verdict for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Normal,
    Abnormal,
}

/// Aggregate verdict for the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Normal,
    Abnormal,
}

impl ChannelStatus {
    pub fn is_normal(self) -> bool {
        self == ChannelStatus::Normal
    }
}

impl PipelineStatus {
    pub fn is_normal(self) -> bool {
        self == PipelineStatus::Normal
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelStatus::Normal => "normal",
            ChannelStatus::Abnormal => "abnormal",
        })
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineStatus::Normal => "normal",
            PipelineStatus::Abnormal => "abnormal",
        })
    }
}

/// Verdict for one evaluated channel, with the inputs that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelAssessment {
    pub channel: Channel,
    pub value: f64,
    pub range: SafeRange,
    pub status: ChannelStatus,
}

/// Per-channel breakdown plus the aggregate verdict for a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Evaluated channels in configuration order
    pub channels: Vec<ChannelAssessment>,
    pub status: PipelineStatus,
}

impl Assessment {
    /// Status of a single channel, if it was evaluated.
    pub fn channel_status(&self, channel: Channel) -> Option<ChannelStatus> {
        self.channels
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| c.status)
    }

    /// Channels that were out of range.
    pub fn abnormal_channels(&self) -> impl Iterator<Item = &ChannelAssessment> {
        self.channels.iter().filter(|c| !c.status.is_normal())
    }
}
