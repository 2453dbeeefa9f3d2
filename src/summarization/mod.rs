//! Abstractions for generating summaries with a local model.
//!
//! The pipeline only sees [`SummarizationClient`]; the Ollama adapter turns a chunk and its token
//! bounds into a prompt plus a `num_predict` cap, since the runtime has no native minimum length.

use crate::config::Config;
use crate::ollama::{GenerationOptions, ModelClientError, OllamaTransport};
use crate::processing::budget::tokens_to_words;
use async_trait::async_trait;

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationRequest {
    /// Text to summarize (a chunk, or the combined chunk summaries).
    pub text: String,
    /// Desired minimum output length in tokens.
    pub min_tokens: usize,
    /// Maximum output length in tokens.
    pub max_tokens: usize,
}

/// Interface implemented by summarization backends.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Summarize the request text within its token bounds.
    async fn summarize(&self, request: SummarizationRequest) -> Result<String, ModelClientError>;
}

/// Summarization backed by an Ollama model.
pub struct OllamaSummarizationClient {
    transport: OllamaTransport,
    model: String,
    temperature: f32,
}

impl OllamaSummarizationClient {
    /// Build a client for `model` on the given transport.
    pub fn new(transport: OllamaTransport, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            transport,
            model: model.into(),
            temperature,
        }
    }

    /// Build a client from runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self, ModelClientError> {
        Ok(Self::new(
            OllamaTransport::new(config.ollama_url.clone())?,
            config.summarization_model.clone(),
            config.summary_temperature,
        ))
    }
}

/// Prompt asking for a plain-prose summary within a word range.
pub(crate) fn build_summary_prompt(request: &SummarizationRequest) -> String {
    let min_words = tokens_to_words(request.min_tokens);
    let max_words = tokens_to_words(request.max_tokens).max(min_words);
    format!(
        "You summarize documents faithfully. Keep names, figures and conclusions. \
Do not add information that is not in the text. \
Write between {min_words} and {max_words} words of plain prose without headings or bullet points.\n\n\
Text:\n{}\n\nSummary:",
        request.text.trim()
    )
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn summarize(&self, request: SummarizationRequest) -> Result<String, ModelClientError> {
        let prompt = build_summary_prompt(&request);
        let options = GenerationOptions {
            do_sample: self.temperature > 0.0,
            temperature: self.temperature,
            top_p: 1.0,
            max_new_tokens: request.max_tokens,
        };
        tracing::debug!(
            model = %self.model,
            min_tokens = request.min_tokens,
            max_tokens = request.max_tokens,
            input_chars = request.text.len(),
            "Requesting summary"
        );
        self.transport.generate(&self.model, &prompt, options).await
    }
}
