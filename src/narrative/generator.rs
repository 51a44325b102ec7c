//! The text-generation capability behind narration.

use crate::error::GenerationError;
use async_trait::async_trait;

/// Turns a prompt into free text.
///
/// Implementations may call a hosted model, a local one, or return canned
/// text. They must report failure instead of inventing output.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_context: &str,
        user_prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, GenerationError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Generator used when no language model is configured.
#[derive(Debug, Clone, Default)]
pub struct OfflineGenerator;

/// Text returned by [`OfflineGenerator`].
pub const OFFLINE_NARRATION: &str =
    "No language model is configured; automated narration is disabled for this session.";

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(
        &self,
        _system_context: &str,
        _user_prompt: &str,
        _max_output_tokens: u32,
    ) -> Result<String, GenerationError> {
        Ok(OFFLINE_NARRATION.to_string())
    }

    fn name(&self) -> &str {
        "offline"
    }
}
