use thiserror::Error;

/// Failure taxonomy for the query pipeline. Every variant is recoverable:
/// the orchestrator degrades to the next branch and ultimately to the
/// refusal sentinel, so none of these ever reach the caller as an error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The parser could not produce a usable ParsedQuery, even after the
    /// keyword fallback.
    #[error("Query parse failed: {0}")]
    Parse(String),

    /// The executor ran but found nothing acceptable for this intent.
    #[error("No matching records for query: {0}")]
    ExecutionMiss(String),

    /// Vector retrieval returned no chunk above the similarity threshold.
    #[error("No relevant chunks above threshold {threshold}")]
    RetrievalMiss { threshold: f32 },

    /// An upstream service (LLM, embedder) failed or returned garbage.
    #[error("Upstream service failure: {0}")]
    Upstream(String),

    /// An upstream call exceeded its deadline.
    #[error("Deadline exceeded after {0} ms")]
    Timeout(u64),
}
