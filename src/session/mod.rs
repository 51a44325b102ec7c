//! Monitoring sessions.
//!
//! A [`Session`] owns everything one monitoring run needs and drives the
//! sample → classify → record → narrate cycle on a fixed interval. Displays
//! observe it through a [`SessionHandle`]: shared read access to the
//! [`History`], a broadcast of [`SessionEvent`]s, and a stop switch.

pub mod config;
pub mod events;
pub mod history;
pub mod runner;

// Re-export commonly used items
pub use config::{MonitorConfig, NarrationConfig};
pub use events::{NarrationOutcome, NarrationRecord, SessionEvent, TickReport};
pub use history::History;
pub use runner::{Session, SessionHandle, TickOutcome};
