//! Core data types and error definitions for the processing pipeline.

use crate::document::{ExtractionError, RenderError};
use crate::ollama::ModelClientError;
use crate::session::ChatMessage;
use anyhow::Error as TokenizerError;
use thiserror::Error;

/// Caller mistakes. Surfaced as 4xx responses and never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No text was supplied.
    #[error("Please provide valid text to summarize")]
    EmptyText,
    /// The document is too short for a meaningful summary.
    #[error("Text is too short to summarize meaningfully ({words} words, at least {minimum} required)")]
    TooShort {
        /// Words found in the input.
        words: usize,
        /// Minimum accepted word count.
        minimum: usize,
    },
    /// The question was blank.
    #[error("Please provide a question")]
    MissingQuestion,
    /// A question arrived before any document was summarized.
    #[error(
        "No content available. Please summarize text or upload a PDF first before asking questions."
    )]
    NoContextAvailable,
    /// The multipart body carried no `file` field.
    #[error("No file uploaded")]
    MissingFile,
    /// The upload is not a PDF.
    #[error("Only PDF files are supported")]
    NotPdf,
    /// The PDF contained no text layer.
    #[error("Could not extract text from PDF or PDF is empty")]
    NoExtractableText,
    /// `download-summary` was called without a summary.
    #[error("No summary provided")]
    EmptySummary,
    /// A form or JSON field held an unusable value.
    #[error("Invalid value for {field}: {value:?}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },
    /// The request body could not be decoded.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

/// Errors produced while splitting text into token-bounded chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The token ceiling was zero.
    #[error("chunk token ceiling must be greater than zero")]
    InvalidCeiling,
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Model or encoding we attempted to load.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
    /// A token slice could not be turned back into text.
    #[error("token slice for chunk {index} does not decode to valid text")]
    Undecodable {
        /// Index of the chunk being built.
        index: usize,
    },
}

/// Errors emitted by the summarization and question-answering pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The request was rejected before any model work started.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// A summarization call failed; partial summaries are discarded.
    #[error("{}", summarization_message(.chunk_index, .source))]
    Summarization {
        /// Failing chunk, or `None` for the condensation pass.
        chunk_index: Option<usize>,
        /// Model client failure.
        #[source]
        source: ModelClientError,
    },
    /// The QA model failed to produce an answer.
    #[error("Failed to answer question: {0}")]
    QuestionAnswering(#[source] ModelClientError),
    /// PDF text extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// PDF rendering failed.
    #[error(transparent)]
    Rendering(#[from] RenderError),
    /// A pipeline task stopped before reporting a result.
    #[error("Pipeline task aborted: {0}")]
    Aborted(String),
}

fn summarization_message(chunk_index: &Option<usize>, source: &ModelClientError) -> String {
    match chunk_index {
        Some(index) => format!("Failed to summarize chunk {}: {source}", index + 1),
        None => format!("Failed to condense combined summary: {source}"),
    }
}

impl ProcessingError {
    /// Whether the error is the caller's fault (4xx) rather than a processing failure (5xx).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the model ran out of memory or similar resources.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::Summarization {
                source: ModelClientError::ResourceExhausted(_),
                ..
            } | Self::QuestionAnswering(ModelClientError::ResourceExhausted(_))
        )
    }
}

/// One chunk of the source document, bounded by the model's input-token ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the source document, starting at zero.
    pub index: usize,
    /// Decoded chunk text.
    pub text: String,
    /// Number of tokens in the slice this chunk was decoded from.
    pub token_count: usize,
}

/// Summary produced for a single chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    /// Index of the summarized chunk.
    pub chunk_index: usize,
    /// Model output for the chunk.
    pub summary_text: String,
}

/// Result of a completed summarization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Final summary text.
    pub summary: String,
    /// Word count of the input document.
    pub original_length: usize,
    /// Word count of the summary.
    pub summary_length: usize,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Whether the combined chunk summaries needed a condensation pass.
    pub condensed: bool,
}

/// Result of a completed question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Generated answer.
    pub answer: String,
    /// Conversation after appending this turn.
    pub history: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        let error = ProcessingError::from(ValidationError::NoContextAvailable);
        assert!(error.is_validation());
        assert!(error.to_string().starts_with("No content available"));
    }

    #[test]
    fn summarization_errors_name_the_chunk() {
        let error = ProcessingError::Summarization {
            chunk_index: Some(2),
            source: ModelClientError::GenerationFailed("boom".into()),
        };
        assert!(!error.is_validation());
        assert!(error.to_string().contains("chunk 3"));

        let condense = ProcessingError::Summarization {
            chunk_index: None,
            source: ModelClientError::ResourceExhausted("out of memory".into()),
        };
        assert!(condense.to_string().contains("condense"));
        assert!(condense.is_resource_exhaustion());
    }
}
