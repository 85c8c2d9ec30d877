//! Predefined question/answer fast path.
//!
//! Curated QA pairs are embedded once at startup. A query whose embedding
//! lands close enough to a stored question gets the stored answer verbatim
//! with no model call. A missing pairs file means an empty store, not an
//! error, so deployments without curation still run.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embeddings::{cosine_similarity, embed_batch_with_retry, EmbeddingModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QaFile {
    Wrapped { qa_pairs: Vec<QaPair> },
    Bare(Vec<QaPair>),
}

#[derive(Default)]
pub struct QaStore {
    pairs: Vec<QaPair>,
    embeddings: Vec<Option<Vec<f32>>>,
}

impl QaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(pairs: Vec<QaPair>) -> Self {
        let embeddings = vec![None; pairs.len()];
        Self { pairs, embeddings }
    }

    /// Load pairs from a JSON file, either a bare array or an object with
    /// a `qa_pairs` key.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no predefined QA file, starting empty");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read QA pairs from {}", path.display()))?;
        let parsed: QaFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse QA pairs in {}", path.display()))?;
        let pairs = match parsed {
            QaFile::Wrapped { qa_pairs } => qa_pairs,
            QaFile::Bare(pairs) => pairs,
        };
        info!(count = pairs.len(), "loaded predefined QA pairs");
        Ok(Self::load(pairs))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Embed every stored question. Pairs whose batch fails stay unembedded
    /// and simply never match.
    pub fn embed_all(&mut self, model: &dyn EmbeddingModel, batch_size: usize, max_retries: u32) {
        let questions: Vec<&str> = self.pairs.iter().map(|p| p.question.as_str()).collect();
        self.embeddings = vec![None; self.pairs.len()];
        for (index, vector) in embed_batch_with_retry(model, &questions, batch_size, max_retries) {
            self.embeddings[index] = Some(vector);
        }
        let embedded = self.embeddings.iter().filter(|e| e.is_some()).count();
        info!(embedded, total = self.pairs.len(), "embedded predefined questions");
    }

    /// Stored answer for the closest question at or above `threshold`.
    pub fn find_match(&self, query_embedding: &[f32], threshold: f32) -> Option<&str> {
        let mut best: Option<(usize, f32)> = None;
        for (i, embedding) in self.embeddings.iter().enumerate() {
            let Some(embedding) = embedding else { continue };
            let score = cosine_similarity(query_embedding, embedding);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        match best {
            Some((i, score)) if score >= threshold => Some(self.pairs[i].answer.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    struct AxisEmbedder;

    impl EmbeddingModel for AxisEmbedder {
        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_document(text)
        }

        fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
            // Unit vector rotated by question "topic" for a stable test space.
            let angle = match text {
                t if t.contains("cctv") => 0.0f32,
                t if t.contains("alarm") => 1.0,
                _ => 2.0,
            };
            Ok(vec![angle.cos(), angle.sin()])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn pairs() -> Vec<QaPair> {
        vec![
            QaPair {
                question: "how many proposals have cctv?".into(),
                answer: "3 proposal(s) match the criteria.".into(),
            },
            QaPair {
                question: "which proposals have an alarm?".into(),
                answer: "Found 2 matching proposal(s).".into(),
            },
        ]
    }

    #[test]
    fn missing_file_loads_an_empty_store() {
        let store = QaStore::load_from_file(Path::new("/nonexistent/qa_pairs.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn parses_bare_array_and_wrapped_object() {
        let bare: QaFile =
            serde_json::from_str(r#"[{"question":"q","answer":"a"}]"#).unwrap();
        let wrapped: QaFile =
            serde_json::from_str(r#"{"qa_pairs":[{"question":"q","answer":"a"}]}"#).unwrap();
        for parsed in [bare, wrapped] {
            let pairs = match parsed {
                QaFile::Wrapped { qa_pairs } => qa_pairs,
                QaFile::Bare(pairs) => pairs,
            };
            assert_eq!(pairs.len(), 1);
            assert_eq!(pairs[0].answer, "a");
        }
    }

    #[test]
    fn close_question_returns_the_stored_answer() {
        let mut store = QaStore::load(pairs());
        store.embed_all(&AxisEmbedder, 16, 0);

        let query = AxisEmbedder.embed_query("do they have cctv?").unwrap();
        assert_eq!(
            store.find_match(&query, 0.85),
            Some("3 proposal(s) match the criteria.")
        );
    }

    #[test]
    fn distant_question_does_not_match() {
        let mut store = QaStore::load(pairs());
        store.embed_all(&AxisEmbedder, 16, 0);

        let query = AxisEmbedder.embed_query("tell me about the premises").unwrap();
        assert_eq!(store.find_match(&query, 0.85), None);
    }

    #[test]
    fn unembedded_store_never_matches() {
        let store = QaStore::load(pairs());
        assert_eq!(store.find_match(&[1.0, 0.0], 0.0), None);
    }
}
