//! Summarization pipeline: budgeting, chunking, per-chunk summaries, reassembly, and QA.

pub mod assemble;
pub mod budget;
pub mod chunking;
pub mod qa;
mod service;
pub mod summarize;
pub mod types;

pub use budget::{BudgetOverrides, LengthBudget};
pub use chunking::{TiktokenTokenizer, Tokenizer};
pub use service::{ProcessingApi, ProcessingService, ServiceSettings};
pub use types::{
    AnswerOutcome, Chunk, ChunkResult, ChunkingError, ProcessingError, SummaryOutcome,
    ValidationError,
};
