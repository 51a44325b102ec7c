//! Events published by a running session.

use crate::monitoring::data::{Assessment, PipelineStatus, Reading};
use crate::monitoring::energy::EnergySample;
use serde::{Deserialize, Serialize};

/// Everything the display needs about one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub reading: Reading,
    pub assessment: Assessment,
    /// Present when the profile meters pump energy
    pub energy: Option<EnergySample>,
}

impl TickReport {
    pub fn sequence(&self) -> u64 {
        self.reading.sequence
    }

    pub fn status(&self) -> PipelineStatus {
        self.assessment.status
    }
}

/// Result of one narration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrationOutcome {
    /// Commentary produced by the generator
    Text { text: String },
    /// The request failed; shown instead of stale or invented text
    Failed { error: String },
}

impl NarrationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, NarrationOutcome::Failed { .. })
    }
}

/// Narration attached to the tick whose reading it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationRecord {
    pub sequence: u64,
    /// When the outcome was known (Unix timestamp in milliseconds)
    pub completed_at: u64,
    pub outcome: NarrationOutcome,
}

/// Messages broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A reading was sampled and classified
    Tick(TickReport),
    /// A narration request resolved
    Narration(NarrationRecord),
    /// The session stopped and will publish nothing more
    Stopped { ticks: u64 },
}
