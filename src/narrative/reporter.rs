//! Narrative reporter: prompt in, safety commentary out.

use crate::error::GenerationError;
use crate::monitoring::data::{Reading, SafeRanges};
use crate::narrative::generator::TextGenerator;
use crate::narrative::prompt::{self, DEFAULT_SYSTEM_CONTEXT};
use std::sync::Arc;
use tracing::debug;

/// Default completion budget.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 150;

/// Builds prompts and hands them to a [`TextGenerator`].
///
/// The reporter never retries and never substitutes text of its own: a
/// failed or empty generation comes back as a [`GenerationError`].
#[derive(Clone)]
pub struct NarrativeReporter {
    generator: Arc<dyn TextGenerator>,
    system_context: String,
    max_output_tokens: u32,
}

impl NarrativeReporter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            system_context: DEFAULT_SYSTEM_CONTEXT.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    /// Set the system message.
    pub fn with_system_context(mut self, context: impl Into<String>) -> Self {
        self.system_context = context.into();
        self
    }

    /// Set the completion budget.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Render the prompt for a reading. See [`prompt::build_prompt`].
    pub fn build_prompt(&self, reading: &Reading, ranges: &SafeRanges) -> String {
        prompt::build_prompt(reading, ranges)
    }

    /// Ask the generator for commentary on `prompt`.
    pub async fn report(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(
            generator = self.generator.name(),
            prompt_len = prompt.len(),
            "Requesting narration"
        );
        let text = self
            .generator
            .generate(&self.system_context, prompt, self.max_output_tokens)
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

impl std::fmt::Debug for NarrativeReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeReporter")
            .field("generator", &self.generator.name())
            .field("system_context", &self.system_context)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records what it was asked and answers with a fixed result.
    struct Scripted {
        answer: std::result::Result<String, &'static str>,
        calls: Mutex<Vec<(String, String, u32)>>,
    }

    impl Scripted {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(msg: &'static str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(msg),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(
            &self,
            system_context: &str,
            user_prompt: &str,
            max_output_tokens: u32,
        ) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push((
                system_context.to_string(),
                user_prompt.to_string(),
                max_output_tokens,
            ));
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(GenerationError::delegate(*msg)),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_report_passes_context_and_budget() {
        let generator = Scripted::ok("  Pressure is fine.  ");
        let reporter = NarrativeReporter::new(generator.clone())
            .with_system_context("ctx")
            .with_max_output_tokens(250);

        let text = reporter.report("prompt").await.unwrap();
        assert_eq!(text, "Pressure is fine.");

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("ctx".to_string(), "prompt".to_string(), 250)]);
    }

    #[tokio::test]
    async fn test_report_surfaces_delegate_error() {
        let reporter = NarrativeReporter::new(Scripted::failing("quota exceeded"));
        let err = reporter.report("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::Delegate(_)));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_blank_output_is_an_error() {
        let reporter = NarrativeReporter::new(Scripted::ok(" \n\t "));
        let err = reporter.report("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_default_settings() {
        let generator = Scripted::ok("ok");
        let reporter = NarrativeReporter::new(generator.clone());
        reporter.report("p").await.unwrap();

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls[0].0, DEFAULT_SYSTEM_CONTEXT);
        assert_eq!(calls[0].2, DEFAULT_MAX_OUTPUT_TOKENS);
    }
}
