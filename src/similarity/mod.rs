//! Document similarity - working set of embeddings and incremental edges
//!
//! One index instance lives for one operation: it is rebuilt from the
//! persisted embeddings, mutated in memory, and discarded. Two operations
//! racing on the same corpus can both snapshot before either write lands and
//! miss their mutual edge; serializing writes is the store's concern, not
//! handled here.

use serde::{Deserialize, Serialize};

use crate::error::RankError;

/// Directed similarity row. Similarity is symmetric; each pair is stored as
/// two directed rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub source_id: i64,
    pub target_id: i64,
    pub score: f64,
}

/// Distance/similarity metric with its own ordering convention.
///
/// Euclidean is a distance (smaller = closer); cosine is a similarity
/// (larger = closer). The two must never share an implicit sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Cosine,
}

impl Metric {
    /// Evaluate the metric between two embeddings.
    pub fn compute(&self, a: &[f32], b: &[f32]) -> Result<f64, RankError> {
        match self {
            Metric::Euclidean => Ok(euclidean_distance(a, b)),
            Metric::Cosine => cosine_similarity(a, b),
        }
    }

    /// True when `a` is closer than `b` under this metric's convention.
    pub fn is_closer(&self, a: f64, b: f64) -> bool {
        match self {
            Metric::Euclidean => a < b,
            Metric::Cosine => a > b,
        }
    }
}

/// L2 norm of (a - b); smaller means closer.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity; larger means closer. Zero-norm input is degenerate.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, RankError> {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(RankError::DegenerateVector);
    }
    Ok(dot / (norm_a * norm_b))
}

fn dot_product(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}

/// Parallel (ids, embeddings) working set.
pub struct SimilarityIndex {
    ids: Vec<i64>,
    embeddings: Vec<Vec<f32>>,
}

impl SimilarityIndex {
    /// Build a working set from the persisted snapshot. The two lists are
    /// parallel and must stay the same length.
    pub fn new(ids: Vec<i64>, embeddings: Vec<Vec<f32>>) -> Result<Self, RankError> {
        if ids.len() != embeddings.len() {
            return Err(RankError::collaborator(format!(
                "embedding snapshot mismatch: {} ids, {} vectors",
                ids.len(),
                embeddings.len()
            )));
        }
        Ok(Self { ids, embeddings })
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Embedding of one document in the working set.
    pub fn embedding_for(&self, id: i64) -> Option<&[f32]> {
        self.ids
            .iter()
            .position(|&i| i == id)
            .map(|pos| self.embeddings[pos].as_slice())
    }

    /// The k documents closest to `target`, ordered by the metric's own
    /// convention (ascending distance, descending similarity).
    pub fn k_nearest_neighbors(
        &self,
        target: &[f32],
        k: usize,
        metric: Metric,
    ) -> Result<Vec<(i64, f64)>, RankError> {
        let mut scored = Vec::with_capacity(self.ids.len());
        for (id, embedding) in self.ids.iter().zip(&self.embeddings) {
            scored.push((*id, metric.compute(target, embedding)?));
        }
        scored.sort_by(|a, b| {
            if metric.is_closer(a.1, b.1) {
                std::cmp::Ordering::Less
            } else if metric.is_closer(b.1, a.1) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Un-normalized dot-product rows between a new document and every
    /// existing one, both directions. Empty when the working set is empty.
    pub fn compute_similarities(&self, new_id: i64, new_embedding: &[f32]) -> Vec<SimilarityEdge> {
        let mut edges = Vec::with_capacity(2 * self.ids.len());
        for (id, embedding) in self.ids.iter().zip(&self.embeddings) {
            let score = dot_product(embedding, new_embedding);
            edges.push(SimilarityEdge {
                source_id: *id,
                target_id: new_id,
                score,
            });
        }
        for (id, embedding) in self.ids.iter().zip(&self.embeddings) {
            let score = dot_product(embedding, new_embedding);
            edges.push(SimilarityEdge {
                source_id: new_id,
                target_id: *id,
                score,
            });
        }
        edges
    }

    /// Compute rows against the pre-insertion set (no self-edge), then
    /// append the new document to the working set. With N existing peers
    /// this yields exactly 2N rows.
    pub fn add_document(&mut self, new_id: i64, new_embedding: Vec<f32>) -> Vec<SimilarityEdge> {
        let edges = self.compute_similarities(new_id, &new_embedding);
        self.ids.push(new_id);
        self.embeddings.push(new_embedding);
        edges
    }
}
