// ABOUTME: One-shot summary of an execution result
// ABOUTME: Free text output, never parsed

use std::sync::Arc;

use genly_ai::{AIServiceResult, CompletionRequest, LanguageModel};
use tracing::info;

use crate::prompts;

/// Summaries run warmer than code generation
pub const SUMMARY_TEMPERATURE: f32 = 0.8;

#[derive(Clone)]
pub struct ResultSummarizer {
    model: Arc<dyn LanguageModel>,
}

impl ResultSummarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn summarize(&self, output: &str, request: &str) -> AIServiceResult<String> {
        info!("Summarizing {} bytes of output", output.len());

        let completion = self
            .model
            .complete(
                CompletionRequest::new(prompts::summary_prompt(output, request))
                    .with_temperature(SUMMARY_TEMPERATURE),
            )
            .await?;

        Ok(completion.text)
    }
}
