//! LRU cache over an embedding backend.
//!
//! Query embeddings repeat heavily in a chat session (follow-ups, the
//! predefined-QA probe and retrieval both embed the same text), so query
//! calls are cached. Document embedding happens once at ingest and goes
//! straight through.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::Result;
use lru::LruCache;
use parking_lot::Mutex;

use super::EmbeddingModel;

pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingModel>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingModel>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity >= 1");
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl EmbeddingModel for CachedEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.cache.lock().get(text) {
            return Ok(hit.clone());
        }
        let vector = self.inner.embed_query(text)?;
        self.cache.lock().put(text.to_string(), vector.clone());
        Ok(vector)
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed_document(text)
    }

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.inner.embed_documents(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl EmbeddingModel for CountingEmbedder {
        fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }

        fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    #[test]
    fn repeated_query_hits_the_cache() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 10);

        cached.embed_query("how many have cctv?").unwrap();
        cached.embed_query("how many have cctv?").unwrap();
        cached.embed_query("how many have cctv?").unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn document_embedding_bypasses_the_cache() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 10);

        cached.embed_document("chunk text").unwrap();
        cached.embed_document("chunk text").unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty());
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 2);

        cached.embed_query("a").unwrap();
        cached.embed_query("bb").unwrap();
        cached.embed_query("ccc").unwrap();
        cached.embed_query("a").unwrap();

        // "a" was evicted by "ccc" and had to be recomputed.
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }
}
