//! Question-answering collaborator.

use crate::config::Config;
use crate::ollama::{GenerationOptions, ModelClientError, OllamaTransport};
use async_trait::async_trait;

/// Prompt plus sampling options for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRequest {
    /// Fully rendered instruction prompt.
    pub prompt: String,
    /// Generation parameters.
    pub options: GenerationOptions,
}

/// Interface implemented by question-answering backends.
#[async_trait]
pub trait QuestionAnswerClient: Send + Sync {
    /// Generate an answer for the prompt.
    async fn answer(&self, request: AnswerRequest) -> Result<String, ModelClientError>;
}

/// Question answering backed by an Ollama model.
pub struct OllamaAnswerClient {
    transport: OllamaTransport,
    model: String,
}

impl OllamaAnswerClient {
    /// Build a client for `model` on the given transport.
    pub fn new(transport: OllamaTransport, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    /// Build a client from runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self, ModelClientError> {
        Ok(Self::new(
            OllamaTransport::new(config.ollama_url.clone())?,
            config.qa_model.clone(),
        ))
    }
}

#[async_trait]
impl QuestionAnswerClient for OllamaAnswerClient {
    async fn answer(&self, request: AnswerRequest) -> Result<String, ModelClientError> {
        tracing::debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            max_new_tokens = request.options.max_new_tokens,
            "Requesting answer"
        );
        self.transport
            .generate(&self.model, &request.prompt, request.options)
            .await
    }
}
