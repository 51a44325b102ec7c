//! # pipewatch - Pipeline Integrity Monitoring
//!
//! Simulated pipeline sensors checked against configured safe ranges, with
//! a language model asked for a plain-language safety assessment of every
//! reading.
//!
//! ## Features
//!
//! - **Simulated sensors**: pressure, vibration, temperature and pump energy
//! - **Safe-range classification**: inclusive per-channel checks and an
//!   aggregate pipeline verdict, total over NaN and infinities
//! - **Narration**: prompts rendered from readings, answered by any
//!   [`TextGenerator`] (hosted chat-completion API or offline)
//! - **Sessions**: cancellable tick loop with shared history and an event stream
//! - **Web dashboard**: live cards and trends via WebSocket
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipewatch::{start_web_server, MonitorConfig, NarrativeReporter, OfflineGenerator, Session, WebConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reporter = NarrativeReporter::new(Arc::new(OfflineGenerator));
//!     let session = Session::simulated(MonitorConfig::default(), reporter)?;
//!     let handle = session.handle();
//!     tokio::spawn(session.run());
//!
//!     start_web_server(WebConfig::default().with_port(8080), handle).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod monitoring;
pub mod narrative;
pub mod session;
pub mod web;

// Re-export public API
pub use error::{GenerationError, MonitorError, Result};
pub use monitoring::{
    assess, classify, classify_channel, Assessment, Channel, ChannelStatus, EnergyLedger,
    EnergySample, PipelineStatus, ProfileKind, Reading, ReadingSource, RenewableGeneration,
    SafeRange, SafeRanges, SamplerProfile, SensorSampler,
};
pub use narrative::{
    build_prompt, NarrativeReporter, OfflineGenerator, OpenAiGenerator, TextGenerator,
};
pub use session::{
    History, MonitorConfig, NarrationOutcome, NarrationRecord, Session, SessionEvent,
    SessionHandle, TickOutcome, TickReport,
};
pub use web::{start_web_server, WebConfig};

/// The default sampling interval in seconds
pub const DEFAULT_INTERVAL_SECS: f64 = 4.0;

/// The default dashboard port
pub const DEFAULT_WEB_PORT: u16 = 8080;
