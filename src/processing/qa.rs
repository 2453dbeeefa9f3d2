//! Question answering grounded on the current session.

use super::chunking::{Tokenizer, leading_chunk};
use super::types::{ProcessingError, ValidationError};
use crate::answering::{AnswerRequest, QuestionAnswerClient};
use crate::config::Config;
use crate::ollama::GenerationOptions;
use crate::progress::{ProgressReporter, Stage};
use crate::session::{ChatMessage, ChatRole, SessionContext};

/// Answer returned when the model produces nothing.
pub const FALLBACK_ANSWER: &str =
    "I couldn't find a specific answer in the document. Please try rephrasing your question.";

/// Knobs controlling prompt construction and generation for questions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QaSettings {
    /// Leading words of the document embedded in the prompt.
    pub context_words: usize,
    /// Optional token ceiling applied after word truncation.
    pub context_tokens: Option<usize>,
    /// Recent chat entries replayed in the prompt; zero disables.
    pub prompt_history: usize,
    /// Sampling options for the QA model.
    pub generation: GenerationOptions,
}

impl QaSettings {
    /// Derive QA settings from runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            context_words: config.qa_context_words,
            context_tokens: config.qa_context_tokens,
            prompt_history: config.qa_prompt_history,
            generation: GenerationOptions {
                do_sample: config.qa_do_sample,
                temperature: config.qa_temperature,
                top_p: config.qa_top_p,
                max_new_tokens: config.qa_max_new_tokens,
            },
        }
    }
}

impl Default for QaSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// First `limit` whitespace-separated words of `text`, joined by single spaces.
pub fn truncate_words(text: &str, limit: usize) -> String {
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the QA prompt from context, recent conversation, and the question.
pub fn build_prompt(context: &str, history: &[ChatMessage], question: &str) -> String {
    let mut prompt = format!(
        "Answer the following question based on the document content provided. \
Give a detailed, helpful response.\n\nDocument Content:\n{context}\n\n"
    );
    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for message in history {
            let speaker = match message.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "Assistant",
            };
            prompt.push_str(speaker);
            prompt.push_str(": ");
            prompt.push_str(message.content.trim());
            prompt.push('\n');
        }
        prompt.push('\n');
    }
    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\n\nAnswer:");
    prompt
}

/// Generate an answer for `question` against the session's document.
///
/// The session is only read; the caller records the turn once the answer is in hand.
pub async fn answer_question(
    client: &dyn QuestionAnswerClient,
    session: &SessionContext,
    question: &str,
    settings: &QaSettings,
    tokenizer: &dyn Tokenizer,
    reporter: &ProgressReporter,
) -> Result<String, ProcessingError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ValidationError::MissingQuestion.into());
    }
    let grounding = session
        .grounding_text()
        .ok_or(ValidationError::NoContextAvailable)?;

    reporter.advance(Stage::Answering, 20, "Preparing answer...");
    let mut context = truncate_words(grounding, settings.context_words);
    if let Some(ceiling) = settings.context_tokens {
        context = leading_chunk(&context, ceiling, tokenizer)?;
    }
    let history = session.recent_history(settings.prompt_history);
    let prompt = build_prompt(&context, &history, question);
    tracing::debug!(
        context_words = context.split_whitespace().count(),
        history_entries = history.len(),
        prompt_chars = prompt.len(),
        "Built QA prompt"
    );

    reporter.advance(Stage::Answering, 50, "Generating answer...");
    let answer = client
        .answer(AnswerRequest {
            prompt,
            options: settings.generation,
        })
        .await
        .map_err(ProcessingError::QuestionAnswering)?;

    let answer = answer.trim();
    if answer.is_empty() {
        tracing::info!("QA model returned an empty answer; using fallback");
        return Ok(FALLBACK_ANSWER.to_string());
    }
    Ok(answer.to_string())
}
