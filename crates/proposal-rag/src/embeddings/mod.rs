//! Embedding backends.
//!
//! Embedding is synchronous behind a trait so the engine can swap the
//! Ollama backend for an in-process model or a test stub. Callers on the
//! async path go through `spawn_blocking`.

pub mod cache;
pub mod ollama;

pub use cache::CachedEmbedder;
pub use ollama::OllamaEmbedding;

use anyhow::Result;
use std::time::Duration;

/// Unified embedding model trait
pub trait EmbeddingModel: Send + Sync {
    /// Embed a search query
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a document/passage
    fn embed_document(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch embed documents for ingestion
    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_document(t)).collect()
    }

    /// Embedding vector dimension
    fn dimension(&self) -> usize;
}

/// Cosine similarity between two vectors. Zero-norm inputs score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Scale a vector to unit length in place. No-op for the zero vector.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Embed documents in batches with exponential backoff, returning
/// `(input_index, embedding)` pairs so a failed batch never shifts the
/// alignment of everything after it.
pub fn embed_batch_with_retry(
    model: &dyn EmbeddingModel,
    texts: &[&str],
    batch_size: usize,
    max_retries: u32,
) -> Vec<(usize, Vec<f32>)> {
    let batch_size = batch_size.max(1);
    let mut out = Vec::with_capacity(texts.len());

    for (batch_idx, batch) in texts.chunks(batch_size).enumerate() {
        let base = batch_idx * batch_size;
        let mut attempt = 0;
        loop {
            match model.embed_documents(batch) {
                Ok(vectors) => {
                    for (offset, vector) in vectors.into_iter().enumerate() {
                        out.push((base + offset, vector));
                    }
                    break;
                }
                Err(err) => {
                    attempt += 1;
                    if attempt > max_retries {
                        tracing::warn!(
                            batch = batch_idx,
                            size = batch.len(),
                            error = %err,
                            "embedding batch failed after retries, skipping"
                        );
                        break;
                    }
                    let delay = Duration::from_secs(1u64 << attempt.min(6));
                    tracing::debug!(
                        batch = batch_idx,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "embedding batch failed, retrying"
                    );
                    std::thread::sleep(delay);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubEmbedder {
        fail_first: AtomicUsize,
    }

    impl EmbeddingModel for StubEmbedder {
        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_document(text)
        }

        fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(anyhow!("backend down"));
            }
            let mut v = vec![text.len() as f32, 1.0];
            normalize(&mut v);
            Ok(v)
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_of_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn batch_embed_keeps_input_indices() {
        let model = StubEmbedder {
            fail_first: AtomicUsize::new(0),
        };
        let texts = ["a", "bb", "ccc", "dddd", "eeeee"];
        let pairs = embed_batch_with_retry(&model, &texts, 2, 0);
        assert_eq!(pairs.len(), 5);
        let indices: Vec<usize> = pairs.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn failed_batch_is_skipped_without_shifting_alignment() {
        // First batch fails once per document with no retries allowed, so
        // the whole batch is dropped and later indices stay correct.
        let model = StubEmbedder {
            fail_first: AtomicUsize::new(1),
        };
        let texts = ["a", "bb", "ccc", "dddd"];
        let pairs = embed_batch_with_retry(&model, &texts, 2, 0);
        let indices: Vec<usize> = pairs.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![2, 3]);
    }
}
