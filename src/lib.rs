#![deny(missing_docs)]

//! Core library for the Docdigest summarization server.

/// Question-answering model collaborator.
pub mod answering;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text extraction and summary rendering.
pub mod document;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline counters.
pub mod metrics;
/// Ollama HTTP transport shared by the model collaborators.
pub mod ollama;
/// Summarization pipeline and question answering.
pub mod processing;
/// Progress reporting for in-flight requests.
pub mod progress;
/// Current document and conversation state.
pub mod session;
/// Summarization model collaborator.
pub mod summarization;
