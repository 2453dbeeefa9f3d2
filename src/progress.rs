//! Overwrite-only progress record shared between the pipeline and pollers.
//!
//! The reporter holds exactly one [`ProgressState`]. Writers replace it wholesale through a
//! `tokio::sync::watch` channel, so readers always observe a complete record and never a history.
//! Reading clones the latest value under a short-lived lock and never waits on the pipeline.

use serde::Serialize;
use tokio::sync::watch;

/// Coarse pipeline stage reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// No request in flight (or the last one failed).
    Idle,
    /// Pulling text out of an uploaded PDF.
    Extracting,
    /// Splitting text into model-sized chunks.
    Chunking,
    /// Summarizing chunks one by one.
    Summarizing,
    /// Combining chunk summaries and optionally condensing them.
    Condensing,
    /// Generating an answer to a follow-up question.
    Answering,
    /// Request finished successfully.
    Done,
}

/// Latest progress snapshot as exposed by `GET /api/progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    /// Current stage.
    pub stage: Stage,
    /// Completion percentage in `0..=100`.
    pub percent: u8,
    /// Human-readable description of the current step.
    pub message: String,
}

impl ProgressState {
    /// The idle record every request family starts from.
    pub fn idle() -> Self {
        Self {
            stage: Stage::Idle,
            percent: 0,
            message: String::new(),
        }
    }

    /// Whether this record marks a finished request.
    pub fn is_terminal(&self) -> bool {
        self.percent >= 100
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Single-slot progress publisher.
#[derive(Debug)]
pub struct ProgressReporter {
    sender: watch::Sender<ProgressState>,
}

impl ProgressReporter {
    /// Create a reporter in the idle state.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ProgressState::idle());
        Self { sender }
    }

    /// Return to `{idle, 0, ""}`. Called at the start of each request family and on failure.
    pub fn reset(&self) {
        self.sender.send_replace(ProgressState::idle());
    }

    /// Publish a new stage and message.
    ///
    /// The percentage never moves backwards within a request: a lower value than the one
    /// currently published keeps the higher one. Only [`ProgressReporter::reset`] lowers it.
    pub fn advance(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        let message = message.into();
        self.sender.send_modify(|state| {
            state.percent = percent.min(100).max(state.percent);
            state.stage = stage;
            state.message = message;
        });
    }

    /// Clone the latest record.
    pub fn snapshot(&self) -> ProgressState {
        self.sender.borrow().clone()
    }

    /// Subscribe to changes, used by the server-sent event stream.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.sender.subscribe()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentage reported after chunk `index` (0-based) of `total` completes.
///
/// Chunk summarization owns the band above [`CHUNKING_PERCENT`] up to [`SUMMARIZING_CEILING`];
/// assembly and condensing use the rest.
pub fn chunk_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return SUMMARIZING_CEILING;
    }
    let ratio = ((index + 1) as f64 / total as f64).min(1.0);
    let band = f64::from(SUMMARIZING_CEILING - CHUNKING_PERCENT);
    CHUNKING_PERCENT + (ratio * band).round() as u8
}

/// Percentage published once the text has been split into chunks.
pub const CHUNKING_PERCENT: u8 = 10;

/// Upper bound of the percentage range used by chunk summarization.
pub const SUMMARIZING_CEILING: u8 = 80;
