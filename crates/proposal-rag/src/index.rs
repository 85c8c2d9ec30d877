//! Flat in-memory vector index.
//!
//! Brute-force inner product over a dense matrix. At proposal-record scale
//! (hundreds of chunks) a matmul beats any ANN structure and keeps scores
//! exact. Vectors are unit length, so inner product is cosine similarity.

use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2};
use uuid::Uuid;

pub struct FlatIndex {
    matrix: Array2<f32>,
    ids: Vec<Uuid>,
    dimension: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredId {
    pub id: Uuid,
    pub score: f32,
}

impl FlatIndex {
    /// Build the index from `(chunk id, embedding)` pairs.
    pub fn build(entries: Vec<(Uuid, Vec<f32>)>, dimension: usize) -> Result<Self> {
        let mut ids = Vec::with_capacity(entries.len());
        let mut flat = Vec::with_capacity(entries.len() * dimension);

        for (id, vector) in entries {
            if vector.len() != dimension {
                return Err(anyhow!(
                    "vector for {} has dimension {}, index expects {}",
                    id,
                    vector.len(),
                    dimension
                ));
            }
            ids.push(id);
            flat.extend(vector);
        }

        let matrix = Array2::from_shape_vec((ids.len(), dimension), flat)
            .map_err(|e| anyhow!("failed to shape index matrix: {}", e))?;

        Ok(Self {
            matrix,
            ids,
            dimension,
        })
    }

    pub fn empty(dimension: usize) -> Self {
        Self {
            matrix: Array2::zeros((0, dimension)),
            ids: Vec::new(),
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Top-k ids by inner product against `query`, highest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredId>> {
        if query.len() != self.dimension {
            return Err(anyhow!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            ));
        }
        if self.ids.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = Array1::from_vec(query.to_vec());
        let scores = self.matrix.dot(&query);

        let mut scored: Vec<ScoredId> = self
            .ids
            .iter()
            .zip(scores.iter())
            .map(|(id, score)| ScoredId {
                id: *id,
                score: *score,
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32) -> Vec<f32> {
        let norm = (x * x + y * y).sqrt();
        vec![x / norm, y / norm]
    }

    #[test]
    fn search_ranks_by_similarity() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let index = FlatIndex::build(
            vec![
                (a, unit(1.0, 0.0)),
                (b, unit(0.0, 1.0)),
                (c, unit(1.0, 1.0)),
            ],
            2,
        )
        .unwrap();

        let hits = index.search(&unit(1.0, 0.1), 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, a);
        assert_eq!(hits[1].id, c);
        assert_eq!(hits[2].id, b);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn search_truncates_to_k() {
        let entries: Vec<(Uuid, Vec<f32>)> =
            (0..10).map(|_| (Uuid::new_v4(), unit(1.0, 0.5))).collect();
        let index = FlatIndex::build(entries, 2).unwrap();
        let hits = index.search(&unit(1.0, 0.0), 4).unwrap();
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = FlatIndex::empty(2);
        assert!(index.is_empty());
        assert!(index.search(&unit(1.0, 0.0), 5).unwrap().is_empty());
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let index = FlatIndex::empty(2);
        assert!(index.search(&[1.0, 0.0, 0.0], 5).is_err());
        assert!(FlatIndex::build(vec![(Uuid::new_v4(), vec![1.0])], 2).is_err());
    }
}
