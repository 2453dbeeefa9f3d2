//! Processing service coordinating chunking, summarization, and question answering.

use crate::{
    answering::{OllamaAnswerClient, QuestionAnswerClient},
    config::Config,
    document::{self, is_pdf_upload},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        assemble::assemble_summary,
        budget::{BudgetOverrides, count_words, plan_budget},
        chunking::{TiktokenTokenizer, Tokenizer, chunk_text},
        qa::{self, QaSettings},
        summarize::summarize_chunks,
        types::{AnswerOutcome, ProcessingError, SummaryOutcome, ValidationError},
    },
    progress::{CHUNKING_PERCENT, ProgressReporter, ProgressState, Stage},
    session::{ChatMessage, SessionContext},
    summarization::{OllamaSummarizationClient, SummarizationClient},
};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::Instrument;
use uuid::Uuid;

/// Pipeline knobs resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSettings {
    /// Input-token ceiling per chunk.
    pub chunk_tokens: usize,
    /// Chunk summaries in flight at once.
    pub concurrency: usize,
    /// Minimum words accepted for summarization.
    pub min_input_words: usize,
    /// Chat entries retained in the session.
    pub chat_history_limit: usize,
    /// Question answering settings.
    pub qa: QaSettings,
}

impl ServiceSettings {
    /// Derive settings from runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_tokens: config.summary_chunk_tokens,
            concurrency: config.summary_concurrency,
            min_input_words: config.min_input_words,
            chat_history_limit: config.chat_history_limit,
            qa: QaSettings::from_config(config),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Owns the model collaborators, the session, and the progress channel.
///
/// Summarize and answer requests are serialized through a single gate so only one pipeline runs
/// at a time. Progress and chat-history reads bypass the gate. Construct the service once near
/// process start and share it through an `Arc`.
pub struct ProcessingService {
    summarizer: Arc<dyn SummarizationClient>,
    answerer: Arc<dyn QuestionAnswerClient>,
    tokenizer: Arc<dyn Tokenizer>,
    progress: Arc<ProgressReporter>,
    session: RwLock<SessionContext>,
    gate: Mutex<()>,
    metrics: PipelineMetrics,
    settings: ServiceSettings,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Summarize raw text and make it the current document.
    async fn summarize_text(
        &self,
        text: String,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError>;

    /// Extract text from an uploaded PDF, then summarize it like [`Self::summarize_text`].
    async fn summarize_pdf(
        &self,
        filename: String,
        bytes: Vec<u8>,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError>;

    /// Answer a question about the current document and record the turn.
    async fn answer_question(&self, question: String) -> Result<AnswerOutcome, ProcessingError>;

    /// Conversation so far.
    async fn chat_history(&self) -> Vec<ChatMessage>;

    /// Drop the conversation, keeping the current document.
    async fn clear_chat(&self);

    /// Render a summary as a downloadable PDF.
    async fn render_summary_pdf(&self, summary: String) -> Result<Vec<u8>, ProcessingError>;

    /// Latest progress record.
    fn progress(&self) -> ProgressState;

    /// Receiver notified on every progress update.
    fn subscribe_progress(&self) -> watch::Receiver<ProgressState>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Build a service wired to the configured Ollama runtime and tokenizer.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        tracing::info!(
            model = %config.summarization_model,
            qa_model = %config.qa_model,
            ollama_url = %config.ollama_url,
            "Initializing model clients"
        );
        let summarizer = OllamaSummarizationClient::from_config(config)
            .context("failed to build summarization client")?;
        let answerer =
            OllamaAnswerClient::from_config(config).context("failed to build QA client")?;
        let tokenizer = TiktokenTokenizer::for_model(&config.tokenizer_model)
            .context("failed to load tokenizer")?;
        tracing::debug!(tokenizer = tokenizer.name(), "Tokenizer ready");

        Ok(Self::with_components(
            Arc::new(summarizer),
            Arc::new(answerer),
            Arc::new(tokenizer),
            ServiceSettings::from_config(config),
        ))
    }

    /// Build a service from explicit collaborators.
    pub fn with_components(
        summarizer: Arc<dyn SummarizationClient>,
        answerer: Arc<dyn QuestionAnswerClient>,
        tokenizer: Arc<dyn Tokenizer>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            summarizer,
            answerer,
            tokenizer,
            progress: Arc::new(ProgressReporter::new()),
            session: RwLock::new(SessionContext::new(settings.chat_history_limit)),
            gate: Mutex::new(()),
            metrics: PipelineMetrics::new(),
            settings,
        }
    }

    /// Summarize `text`, replacing the session document on success.
    pub async fn summarize_text(
        &self,
        text: String,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let request_id = Uuid::new_v4();
        async {
            let _gate = self.gate.lock().await;
            self.progress.reset();
            let result = self.summarize_document(text, overrides).await;
            self.finish(result)
        }
        .instrument(tracing::info_span!("summarize_text", %request_id))
        .await
    }

    /// Validate and extract an uploaded PDF, then summarize its text.
    pub async fn summarize_pdf(
        &self,
        filename: String,
        bytes: Vec<u8>,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError> {
        let request_id = Uuid::new_v4();
        async {
            let _gate = self.gate.lock().await;
            self.progress.reset();
            let result = self.extract_and_summarize(filename, bytes, overrides).await;
            self.finish(result)
        }
        .instrument(tracing::info_span!("summarize_pdf", %request_id))
        .await
    }

    async fn extract_and_summarize(
        &self,
        filename: String,
        bytes: Vec<u8>,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError> {
        if !is_pdf_upload(&filename, &bytes) {
            return Err(ValidationError::NotPdf.into());
        }
        self.progress
            .advance(Stage::Extracting, 5, "Extracting text from PDF...");
        tracing::info!(filename = %filename, bytes = bytes.len(), "Extracting PDF text");
        let text = tokio::task::spawn_blocking(move || document::extract_text(&bytes))
            .await
            .map_err(|error| ProcessingError::Aborted(error.to_string()))??;
        if text.trim().is_empty() {
            return Err(ValidationError::NoExtractableText.into());
        }
        self.summarize_document(text, overrides).await
    }

    async fn summarize_document(
        &self,
        text: String,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let original_length = count_words(&text);
        let budget = plan_budget(original_length, overrides, self.settings.min_input_words)?;
        tracing::info!(
            words = original_length,
            min_words = budget.min_words,
            max_words = budget.max_words,
            "Planned summary budget"
        );

        self.progress
            .advance(Stage::Chunking, CHUNKING_PERCENT, "Splitting text into chunks...");
        let chunks = chunk_text(&text, self.settings.chunk_tokens, self.tokenizer.as_ref())?;
        tracing::debug!(
            chunks = chunks.len(),
            ceiling = self.settings.chunk_tokens,
            "Chunked document"
        );

        let results = summarize_chunks(
            self.summarizer.as_ref(),
            &chunks,
            &budget,
            &self.progress,
            self.settings.concurrency,
        )
        .await?;
        let assembled =
            assemble_summary(self.summarizer.as_ref(), &results, &budget, &self.progress).await?;

        self.session
            .write()
            .await
            .replace_document(text, assembled.text.clone());
        self.metrics
            .record_summary(chunks.len() as u64, assembled.condensed);
        tracing::info!(
            chunks = chunks.len(),
            summary_words = assembled.word_count,
            condensed = assembled.condensed,
            "Summary complete"
        );

        Ok(SummaryOutcome {
            summary: assembled.text,
            original_length,
            summary_length: assembled.word_count,
            chunk_count: chunks.len(),
            condensed: assembled.condensed,
        })
    }

    /// Answer `question` against the current document.
    pub async fn answer_question(
        &self,
        question: String,
    ) -> Result<AnswerOutcome, ProcessingError> {
        let request_id = Uuid::new_v4();
        async {
            let _gate = self.gate.lock().await;
            self.progress.reset();
            let result = self.answer(question).await;
            self.finish(result)
        }
        .instrument(tracing::info_span!("answer_question", %request_id))
        .await
    }

    async fn answer(&self, question: String) -> Result<AnswerOutcome, ProcessingError> {
        let snapshot = self.session.read().await.clone();
        let answer = qa::answer_question(
            self.answerer.as_ref(),
            &snapshot,
            &question,
            &self.settings.qa,
            self.tokenizer.as_ref(),
            &self.progress,
        )
        .await?;

        let history = {
            let mut session = self.session.write().await;
            session.record_turn(question.trim().to_string(), answer.clone());
            session.history()
        };
        self.progress.advance(Stage::Done, 100, "Answer ready!");
        self.metrics.record_answer();
        tracing::info!(
            answer_words = count_words(&answer),
            history = history.len(),
            "Question answered"
        );
        Ok(AnswerOutcome { answer, history })
    }

    /// Render a downloadable PDF for `summary` on the blocking pool.
    pub async fn render_summary_pdf(&self, summary: String) -> Result<Vec<u8>, ProcessingError> {
        if summary.trim().is_empty() {
            return Err(ValidationError::EmptySummary.into());
        }
        let bytes = tokio::task::spawn_blocking(move || document::render_summary_pdf(&summary))
            .await
            .map_err(|error| ProcessingError::Aborted(error.to_string()))??;
        Ok(bytes)
    }

    /// Retrieve the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn finish<T>(&self, result: Result<T, ProcessingError>) -> Result<T, ProcessingError> {
        if let Err(error) = &result {
            self.progress.reset();
            self.metrics.record_failure();
            if error.is_validation() {
                tracing::warn!(error = %error, "Request rejected");
            } else {
                tracing::error!(error = %error, "Request failed");
            }
        }
        result
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn summarize_text(
        &self,
        text: String,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError> {
        ProcessingService::summarize_text(self, text, overrides).await
    }

    async fn summarize_pdf(
        &self,
        filename: String,
        bytes: Vec<u8>,
        overrides: BudgetOverrides,
    ) -> Result<SummaryOutcome, ProcessingError> {
        ProcessingService::summarize_pdf(self, filename, bytes, overrides).await
    }

    async fn answer_question(&self, question: String) -> Result<AnswerOutcome, ProcessingError> {
        ProcessingService::answer_question(self, question).await
    }

    async fn chat_history(&self) -> Vec<ChatMessage> {
        self.session.read().await.history()
    }

    async fn clear_chat(&self) {
        self.session.write().await.clear_chat();
        tracing::info!("Chat history cleared");
    }

    async fn render_summary_pdf(&self, summary: String) -> Result<Vec<u8>, ProcessingError> {
        ProcessingService::render_summary_pdf(self, summary).await
    }

    fn progress(&self) -> ProgressState {
        self.progress.snapshot()
    }

    fn subscribe_progress(&self) -> watch::Receiver<ProgressState> {
        self.progress.subscribe()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}
