//! Per-chunk summarization.

use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};

use super::budget::{ChunkBudget, LengthBudget};
use super::types::{Chunk, ChunkResult, ProcessingError};
use crate::progress::{ProgressReporter, Stage, chunk_percent};
use crate::summarization::{SummarizationClient, SummarizationRequest};

/// Summarize every chunk with its share of `budget`.
///
/// Up to `concurrency` model calls run at once, but results are collected strictly in chunk
/// order and progress is published for the completed in-order prefix, so the reported percentage
/// only grows. The first failing chunk aborts the whole request; outstanding calls are dropped.
pub async fn summarize_chunks(
    client: &dyn SummarizationClient,
    chunks: &[Chunk],
    budget: &LengthBudget,
    reporter: &ProgressReporter,
    concurrency: usize,
) -> Result<Vec<ChunkResult>, ProcessingError> {
    let total = chunks.len();
    let chunk_budget = budget.per_chunk(total);
    tracing::debug!(
        chunks = total,
        chunk_min_tokens = chunk_budget.min_tokens,
        chunk_max_tokens = chunk_budget.max_tokens,
        concurrency,
        "Summarizing chunks"
    );

    let calls: Vec<BoxFuture<'_, Result<ChunkResult, ProcessingError>>> = chunks
        .iter()
        .map(|chunk| summarize_one(client, chunk, chunk_budget))
        .collect();
    let mut pending = stream::iter(calls).buffered(concurrency.max(1));

    let mut results = Vec::with_capacity(total);
    while let Some(result) = pending.next().await {
        let result = result?;
        let position = results.len();
        reporter.advance(
            Stage::Summarizing,
            chunk_percent(position, total),
            format!("Summarized chunk {} of {}", position + 1, total),
        );
        tracing::debug!(
            chunk = result.chunk_index,
            summary_words = result.summary_text.split_whitespace().count(),
            "Chunk summarized"
        );
        results.push(result);
    }

    Ok(results)
}

fn summarize_one<'a>(
    client: &'a dyn SummarizationClient,
    chunk: &'a Chunk,
    budget: ChunkBudget,
) -> BoxFuture<'a, Result<ChunkResult, ProcessingError>> {
    Box::pin(async move {
        let summary = client
            .summarize(SummarizationRequest {
                text: chunk.text.clone(),
                min_tokens: budget.min_tokens,
                max_tokens: budget.max_tokens,
            })
            .await
            .map_err(|source| ProcessingError::Summarization {
                chunk_index: Some(chunk.index),
                source,
            })?;
        Ok(ChunkResult {
            chunk_index: chunk.index,
            summary_text: summary,
        })
    })
}
