use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_summarized: AtomicU64,
    chunks_summarized: AtomicU64,
    condensation_passes: AtomicU64,
    questions_answered: AtomicU64,
    failed_requests: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished summary and the chunks it was built from.
    pub fn record_summary(&self, chunk_count: u64, condensed: bool) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        if condensed {
            self.condensation_passes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an answered question.
    pub fn record_answer(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that ended in an error.
    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            condensation_passes: self.condensation_passes.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents summarized successfully.
    pub documents_summarized: u64,
    /// Chunks summarized across all documents.
    pub chunks_summarized: u64,
    /// Summaries that needed the condensation pass.
    pub condensation_passes: u64,
    /// Questions answered successfully.
    pub questions_answered: u64,
    /// Requests that failed, including validation failures.
    pub failed_requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_summaries_and_chunks() {
        let metrics = PipelineMetrics::new();
        metrics.record_summary(1, false);
        metrics.record_summary(4, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_summarized, 2);
        assert_eq!(snapshot.chunks_summarized, 5);
        assert_eq!(snapshot.condensation_passes, 1);
    }

    #[test]
    fn answers_and_failures_are_counted_separately() {
        let metrics = PipelineMetrics::new();
        metrics.record_answer();
        metrics.record_failure();
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.questions_answered, 1);
        assert_eq!(snapshot.failed_requests, 2);
        assert_eq!(snapshot.documents_summarized, 0);
    }
}
