//! Monitoring session configuration.

use crate::error::{MonitorError, Result};
use crate::monitoring::data::SafeRanges;
use crate::monitoring::energy::DEFAULT_CARBON_INTENSITY;
use crate::monitoring::sampler::ProfileKind;
use crate::narrative::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::narrative::prompt::DEFAULT_SYSTEM_CONTEXT;
use crate::narrative::reporter::DEFAULT_MAX_OUTPUT_TOKENS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a monitoring session.
///
/// Loaded from JSON; every field is optional in the file. When
/// `safe_ranges` is absent or empty the ranges matching `profile` are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Safe ranges in the order they should be reported. Empty in a file
    /// means "use the profile's ranges".
    #[serde(default = "SafeRanges::new")]
    pub safe_ranges: SafeRanges,
    /// Seconds between ticks
    pub sample_interval_secs: f64,
    /// Completion budget for each narration
    pub max_output_tokens: u32,
    /// Narrate on every n-th tick (1 = every tick)
    pub narration_every_ticks: u32,
    /// Give up on a narration after this many seconds
    pub narration_timeout_secs: f64,
    /// Simulation profile for the sampler
    pub profile: ProfileKind,
    /// Seed for reproducible simulations
    pub seed: Option<u64>,
    /// kg CO2 per grid kWh
    pub carbon_intensity: f64,
    /// Language-model settings
    pub narration: NarrationConfig,
}

/// Language-model settings. The API key is never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub model: String,
    pub base_url: String,
    pub system_context: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            system_context: DEFAULT_SYSTEM_CONTEXT.to_string(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            safe_ranges: SafeRanges::standard(),
            sample_interval_secs: crate::DEFAULT_INTERVAL_SECS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            narration_every_ticks: 1,
            narration_timeout_secs: 30.0,
            profile: ProfileKind::Standard,
            seed: None,
            carbon_intensity: DEFAULT_CARBON_INTENSITY,
            narration: NarrationConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_profile(path, None)
    }

    /// Load a file, overriding its profile before ranges are resolved.
    ///
    /// Ranges the file declares are kept; otherwise the ranges of the
    /// effective profile apply.
    pub fn load_with_profile(
        path: impl AsRef<Path>,
        profile: Option<ProfileKind>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::config_error(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&text, profile)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::parse(text, None)
    }

    fn parse(text: &str, profile: Option<ProfileKind>) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text)
            .map_err(|e| MonitorError::config_error(format!("Invalid configuration: {}", e)))?;
        if let Some(profile) = profile {
            config.profile = profile;
        }
        if config.safe_ranges.is_empty() {
            config.safe_ranges = ranges_for(config.profile);
        }
        config.validate()?;
        Ok(config)
    }

    /// Switch profile, replacing the safe ranges with the profile's own.
    pub fn with_profile(mut self, profile: ProfileKind) -> Self {
        self.profile = profile;
        self.safe_ranges = ranges_for(profile);
        self
    }

    pub fn with_safe_ranges(mut self, ranges: SafeRanges) -> Self {
        self.safe_ranges = ranges;
        self
    }

    pub fn with_interval_secs(mut self, secs: f64) -> Self {
        self.sample_interval_secs = secs;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }

    pub fn with_narration_every_ticks(mut self, every: u32) -> Self {
        self.narration_every_ticks = every;
        self
    }

    pub fn with_narration_timeout_secs(mut self, secs: f64) -> Self {
        self.narration_timeout_secs = secs;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Reject anything a session cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.safe_ranges.validate()?;
        if !(self.sample_interval_secs.is_finite() && self.sample_interval_secs > 0.0) {
            return Err(MonitorError::config_error(format!(
                "sample_interval_secs must be a positive number, got {}",
                self.sample_interval_secs
            )));
        }
        if !(self.narration_timeout_secs.is_finite() && self.narration_timeout_secs > 0.0) {
            return Err(MonitorError::config_error(format!(
                "narration_timeout_secs must be a positive number, got {}",
                self.narration_timeout_secs
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(MonitorError::config_error("max_output_tokens must be at least 1"));
        }
        if self.narration_every_ticks == 0 {
            return Err(MonitorError::config_error(
                "narration_every_ticks must be at least 1",
            ));
        }
        if !(self.carbon_intensity.is_finite() && self.carbon_intensity >= 0.0) {
            return Err(MonitorError::config_error(format!(
                "carbon_intensity must be a non-negative number, got {}",
                self.carbon_intensity
            )));
        }
        Ok(())
    }

    /// Whether the tick with this sequence number (starting at 1) is narrated.
    pub fn narrates_on(&self, sequence: u64) -> bool {
        let every = u64::from(self.narration_every_ticks.max(1));
        sequence.saturating_sub(1) % every == 0
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sample_interval_secs)
    }

    pub fn narration_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.narration_timeout_secs)
    }
}

fn ranges_for(profile: ProfileKind) -> SafeRanges {
    match profile {
        ProfileKind::Standard => SafeRanges::standard(),
        ProfileKind::OilTransmission => SafeRanges::oil_transmission(),
        ProfileKind::LeakDetection => SafeRanges::leak_detection(),
    }
}
