//! Natural-language safety narration.
//!
//! Prompts are rendered from structured readings by a pure function and
//! handed to a swappable [`TextGenerator`]. The hosted chat-completion client
//! and the offline generator both live here; nothing in this module knows
//! about sessions or dashboards.

pub mod generator;
pub mod openai;
pub mod prompt;
pub mod reporter;

pub use generator::{OfflineGenerator, TextGenerator};
pub use openai::OpenAiGenerator;
pub use prompt::build_prompt;
pub use reporter::NarrativeReporter;
