//! Reassembly of chunk summaries into the final summary.

use super::budget::{LengthBudget, count_words};
use super::types::{ChunkResult, ProcessingError};
use crate::progress::{ProgressReporter, Stage};
use crate::summarization::{SummarizationClient, SummarizationRequest};

/// Final summary with the bookkeeping reported back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledSummary {
    /// Summary text.
    pub text: String,
    /// Words in `text`.
    pub word_count: usize,
    /// Whether the condensation pass ran.
    pub condensed: bool,
}

/// Join chunk summaries in ascending chunk order, separated by single spaces.
pub fn join_summaries(results: &[ChunkResult]) -> String {
    let mut ordered: Vec<&ChunkResult> = results.iter().collect();
    ordered.sort_by_key(|result| result.chunk_index);
    ordered
        .iter()
        .map(|result| result.summary_text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether the joined summaries exceed the budget and need the condensation pass.
pub fn needs_condensation(results: &[ChunkResult], budget: &LengthBudget) -> bool {
    count_words(&join_summaries(results)) > budget.max_words
}

/// Combine chunk summaries and condense them once if they run over `budget.max_words`.
///
/// Exactly one extra model call is made at most, even if the condensed text is still too long.
pub async fn assemble_summary(
    client: &dyn SummarizationClient,
    results: &[ChunkResult],
    budget: &LengthBudget,
    reporter: &ProgressReporter,
) -> Result<AssembledSummary, ProcessingError> {
    reporter.advance(Stage::Condensing, 90, "Combining summaries...");
    let combined = join_summaries(results);
    let combined_words = count_words(&combined);
    tracing::debug!(
        combined_words,
        min_words = budget.min_words,
        max_words = budget.max_words,
        "Combined chunk summaries"
    );

    let assembled = if combined_words > budget.max_words {
        reporter.advance(Stage::Condensing, 95, "Condensing combined summary...");
        let bounds = budget.as_chunk_budget();
        let condensed = client
            .summarize(SummarizationRequest {
                text: combined,
                min_tokens: bounds.min_tokens,
                max_tokens: bounds.max_tokens,
            })
            .await
            .map_err(|source| ProcessingError::Summarization {
                chunk_index: None,
                source,
            })?;
        let word_count = count_words(&condensed);
        if word_count > budget.max_words {
            tracing::info!(
                word_count,
                max_words = budget.max_words,
                "Condensed summary still exceeds budget; keeping single pass result"
            );
        }
        AssembledSummary {
            text: condensed,
            word_count,
            condensed: true,
        }
    } else {
        AssembledSummary {
            text: combined,
            word_count: combined_words,
            condensed: false,
        }
    };

    reporter.advance(Stage::Done, 100, "Summary complete!");
    Ok(assembled)
}
