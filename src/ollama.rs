//! HTTP transport for a local Ollama runtime.
//!
//! Both model collaborators (summarization and question answering) issue non-streaming
//! `POST /api/generate` calls through [`OllamaTransport`]. Failures are normalized into
//! [`ModelClientError`] so the pipeline can tell an unreachable runtime from a model that ran out
//! of memory.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by generative model collaborators.
#[derive(Debug, Error)]
pub enum ModelClientError {
    /// Runtime was unreachable or the model is not installed.
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Runtime returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Runtime response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Inference ran out of memory. Fatal to the request, not the process.
    #[error("Model ran out of resources: {0}")]
    ResourceExhausted(String),
}

/// Sampling knobs passed to a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    /// Sample from the distribution; when false, decode greedily.
    pub do_sample: bool,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Upper bound on generated tokens.
    pub max_new_tokens: usize,
}

impl GenerationOptions {
    fn to_ollama_options(self) -> serde_json::Value {
        let temperature = if self.do_sample { self.temperature } else { 0.0 };
        json!({
            "temperature": temperature,
            "top_p": self.top_p,
            "num_predict": self.max_new_tokens,
        })
    }
}

/// Thin client for the Ollama generate endpoint.
#[derive(Debug, Clone)]
pub struct OllamaTransport {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}

impl OllamaTransport {
    /// Build a transport for the runtime at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ModelClientError> {
        let http = Client::builder()
            .user_agent("docdigest/0.1")
            .build()
            .map_err(|error| {
                ModelClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    /// Run one non-streaming generation and return the trimmed response text.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, ModelClientError> {
        let payload = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": options.to_ollama_options(),
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ModelClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404: {body}",
                self.endpoint()
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if mentions_memory_exhaustion(&body) {
                return Err(ModelClientError::ResourceExhausted(body));
            }
            return Err(ModelClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            ModelClientError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(ModelClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

fn mentions_memory_exhaustion(body: &str) -> bool {
    let lowered = body.to_lowercase();
    lowered.contains("out of memory") || lowered.contains("requires more system memory")
}
