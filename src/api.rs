//! HTTP surface for Docdigest.
//!
//! Every route lives under `/api`:
//!
//! - `POST /summarize-text` – Summarize raw text (`{text, max_words?, min_words?}`) and make it the
//!   current document. Returns `{summary, original_length, summary_length}`.
//! - `POST /summarize-pdf` – Same, for a multipart upload with a `file` field and optional
//!   `max_words` / `min_words` form fields.
//! - `POST /answer-question` – Answer `{question}` about the current document. Returns
//!   `{answer, history}`.
//! - `POST /download-summary` – Render `{summary}` as `summary.pdf`.
//! - `POST /clear-chat`, `GET /get-chat-history` – Manage the conversation.
//! - `GET /progress`, `GET /progress-stream` – Poll or stream pipeline progress.
//! - `GET /health`, `GET /metrics`, `GET /commands` – Liveness, counters, and route discovery.
//!
//! Errors are returned as `{error}` with 400 for caller mistakes, 503 when the model ran out of
//! resources, and 500 otherwise. Pipeline work runs on a spawned task, so a client that disconnects
//! does not cancel a request that has started.

use crate::processing::{BudgetOverrides, ProcessingApi, ProcessingError, ValidationError};
use crate::progress::{ProgressState, Stage};
use crate::session::ChatMessage;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State, multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: ProcessingApi + 'static,
{
    let api = Router::new()
        .route("/summarize-text", post(summarize_text::<S>))
        .route("/summarize-pdf", post(summarize_pdf::<S>))
        .route("/answer-question", post(answer_question::<S>))
        .route("/download-summary", post(download_summary::<S>))
        .route("/clear-chat", post(clear_chat::<S>))
        .route("/get-chat-history", get(get_chat_history::<S>))
        .route("/progress", get(get_progress::<S>))
        .route("/progress-stream", get(progress_stream::<S>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands));

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Run pipeline work on its own task so it finishes even if the client goes away.
async fn run_detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, ProcessingError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|error| AppError(ProcessingError::Aborted(error.to_string())))?
        .map_err(AppError)
}

/// Request body for `POST /summarize-text`.
#[derive(Deserialize)]
struct SummarizeTextRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    max_words: Option<usize>,
    #[serde(default)]
    min_words: Option<usize>,
}

/// Success response for both summarize endpoints.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
    original_length: usize,
    summary_length: usize,
}

async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<SummarizeTextRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: ProcessingApi + 'static,
{
    let Json(request) = request?;
    let overrides = BudgetOverrides {
        min_words: request.min_words,
        max_words: request.max_words,
    };
    let outcome =
        run_detached(async move { service.summarize_text(request.text, overrides).await }).await?;
    tracing::info!(
        original_length = outcome.original_length,
        summary_length = outcome.summary_length,
        chunks = outcome.chunk_count,
        "Summarize text request completed"
    );
    Ok(Json(SummaryResponse {
        summary: outcome.summary,
        original_length: outcome.original_length,
        summary_length: outcome.summary_length,
    }))
}

/// Parse an optional numeric form field; blank means unset.
fn parse_word_field(field: &'static str, raw: &str) -> Result<Option<usize>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| ValidationError::InvalidField {
            field,
            value: trimmed.to_string(),
        })
}

async fn summarize_pdf<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: ProcessingApi + 'static,
{
    let mut multipart = multipart
        .map_err(|error| ValidationError::MalformedRequest(error.body_text()))?;
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut overrides = BudgetOverrides::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ValidationError::MalformedRequest(error.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|error| ValidationError::MalformedRequest(error.body_text()))?;
                upload = Some((filename, bytes.to_vec()));
            }
            "max_words" | "min_words" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|error| ValidationError::MalformedRequest(error.body_text()))?;
                if name == "max_words" {
                    overrides.max_words = parse_word_field("max_words", &raw)?;
                } else {
                    overrides.min_words = parse_word_field("min_words", &raw)?;
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = upload
        .filter(|(filename, _)| !filename.trim().is_empty())
        .ok_or(ValidationError::MissingFile)?;
    tracing::info!(filename = %filename, bytes = bytes.len(), "Received PDF upload");

    let outcome = run_detached(async move {
        service.summarize_pdf(filename, bytes, overrides).await
    })
    .await?;
    tracing::info!(
        original_length = outcome.original_length,
        summary_length = outcome.summary_length,
        chunks = outcome.chunk_count,
        "Summarize PDF request completed"
    );
    Ok(Json(SummaryResponse {
        summary: outcome.summary,
        original_length: outcome.original_length,
        summary_length: outcome.summary_length,
    }))
}

/// Request body for `POST /answer-question`.
#[derive(Deserialize)]
struct AnswerQuestionRequest {
    #[serde(default)]
    question: String,
}

/// Answer plus the conversation it was appended to.
#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
    history: Vec<ChatMessage>,
}

async fn answer_question<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<AnswerQuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError>
where
    S: ProcessingApi + 'static,
{
    let Json(request) = request?;
    let outcome =
        run_detached(async move { service.answer_question(request.question).await }).await?;
    Ok(Json(AnswerResponse {
        answer: outcome.answer,
        history: outcome.history,
    }))
}

/// Request body for `POST /download-summary`.
#[derive(Deserialize)]
struct DownloadSummaryRequest {
    #[serde(default)]
    summary: String,
}

async fn download_summary<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<DownloadSummaryRequest>, JsonRejection>,
) -> Result<Response, AppError>
where
    S: ProcessingApi + 'static,
{
    let Json(request) = request?;
    let bytes = service.render_summary_pdf(request.summary).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"summary.pdf\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Conversation returned by the chat endpoints.
#[derive(Serialize)]
struct HistoryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    history: Vec<ChatMessage>,
}

async fn clear_chat<S>(State(service): State<Arc<S>>) -> Json<HistoryResponse>
where
    S: ProcessingApi,
{
    service.clear_chat().await;
    Json(HistoryResponse {
        message: Some("Chat history cleared"),
        history: Vec::new(),
    })
}

async fn get_chat_history<S>(State(service): State<Arc<S>>) -> Json<HistoryResponse>
where
    S: ProcessingApi,
{
    Json(HistoryResponse {
        message: None,
        history: service.chat_history().await,
    })
}

async fn get_progress<S>(State(service): State<Arc<S>>) -> Json<ProgressState>
where
    S: ProcessingApi,
{
    Json(service.progress())
}

/// Stream progress updates as server-sent events.
///
/// The stream ends after the record that reaches 100%, or after the idle record that follows a
/// failed request.
async fn progress_stream<S>(
    State(service): State<Arc<S>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: ProcessingApi,
{
    let mut receiver = service.subscribe_progress();
    let stream = async_stream::stream! {
        let mut seen_active = false;
        loop {
            let state = receiver.borrow_and_update().clone();
            let reset_after_failure = seen_active && state.stage == Stage::Idle;
            seen_active |= state.stage != Stage::Idle;
            match Event::default().json_data(&state) {
                Ok(event) => yield Ok(event),
                Err(error) => {
                    tracing::warn!(error = %error, "Failed to encode progress event");
                    break;
                }
            }
            if state.is_terminal() || reset_after_failure || receiver.changed().await.is_err() {
                break;
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "models_loaded": true }))
}

/// Return pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by clients.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize_text",
                method: "POST",
                path: "/api/summarize-text",
                description: "Summarize raw text within a word budget derived from its length. Response returns { \"summary\", \"original_length\", \"summary_length\" }.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "max_words": 200,
                    "min_words": 100
                })),
            },
            CommandDescriptor {
                name: "summarize_pdf",
                method: "POST",
                path: "/api/summarize-pdf",
                description: "Multipart upload with a `file` field holding a PDF; optional `max_words` and `min_words` form fields.",
                request_example: None,
            },
            CommandDescriptor {
                name: "answer_question",
                method: "POST",
                path: "/api/answer-question",
                description: "Answer a question about the most recently summarized document.",
                request_example: Some(json!({ "question": "What is the main conclusion?" })),
            },
            CommandDescriptor {
                name: "download_summary",
                method: "POST",
                path: "/api/download-summary",
                description: "Render a summary as a PDF attachment.",
                request_example: Some(json!({ "summary": "Summary text" })),
            },
            CommandDescriptor {
                name: "clear_chat",
                method: "POST",
                path: "/api/clear-chat",
                description: "Drop the conversation about the current document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "get_chat_history",
                method: "GET",
                path: "/api/get-chat-history",
                description: "Return the conversation about the current document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "progress",
                method: "GET",
                path: "/api/progress",
                description: "Return the latest { \"stage\", \"percent\", \"message\" } record.",
                request_example: None,
            },
            CommandDescriptor {
                name: "progress_stream",
                method: "GET",
                path: "/api/progress-stream",
                description: "Server-sent progress events, closed once percent reaches 100.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/api/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(ProcessingError);

impl AppError {
    fn status(&self) -> StatusCode {
        if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else if self.0.is_resource_exhaustion() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self(inner)
    }
}

impl From<ValidationError> for AppError {
    fn from(inner: ValidationError) -> Self {
        Self(inner.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedRequest(rejection.body_text()).into()
    }
}
