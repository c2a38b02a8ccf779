//! In-memory similarity index.
//!
//! Built once per run from embedded chunks and read-only afterwards. Search is
//! an exhaustive cosine-similarity scan, which is exact and deterministic.

use crate::types::{Chunk, ChunkId, ScoredChunk};
use crate::vector_index::VectorIndex;
use docsmith_core::{AppError, AppResult};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Exact cosine-similarity index over chunk embeddings.
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    /// Entries in ascending chunk-id order
    entries: Vec<Entry>,
    positions: HashMap<ChunkId, usize>,
    dimensions: usize,
}

impl SimilarityIndex {
    /// Build an index from `(chunk, embedding)` pairs.
    ///
    /// Fails if embeddings disagree on dimensionality or a chunk id repeats.
    pub fn build(items: Vec<(Chunk, Vec<f32>)>) -> AppResult<Self> {
        let mut entries: Vec<Entry> = items
            .into_iter()
            .map(|(chunk, embedding)| Entry { chunk, embedding })
            .collect();
        entries.sort_by(|a, b| a.chunk.id.cmp(&b.chunk.id));

        let dimensions = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        let mut positions = HashMap::with_capacity(entries.len());

        for (pos, entry) in entries.iter().enumerate() {
            if entry.embedding.len() != dimensions {
                return Err(AppError::Knowledge(format!(
                    "Embedding dimension mismatch for chunk {}: got {}, expected {}",
                    entry.chunk.id,
                    entry.embedding.len(),
                    dimensions
                )));
            }
            if positions.insert(entry.chunk.id.clone(), pos).is_some() {
                return Err(AppError::Knowledge(format!(
                    "Duplicate chunk id in index: {}",
                    entry.chunk.id
                )));
            }
        }

        tracing::debug!(
            "Built similarity index: {} chunks, {} dimensions",
            entries.len(),
            dimensions
        );

        Ok(Self {
            entries,
            positions,
            dimensions,
        })
    }

    /// Embedding dimensionality (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Top-`k` nearest chunks by cosine similarity.
    ///
    /// `k` larger than the index returns every chunk; an empty index returns
    /// nothing.
    pub fn query(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        if self.entries.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk_id: entry.chunk.id.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        scored.sort_by(compare_ranked);
        scored.truncate(k);
        scored
    }

    /// Iterate chunks in id order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

impl VectorIndex for SimilarityIndex {
    fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        self.query(query_embedding, k)
    }

    fn chunk(&self, id: &ChunkId) -> Option<&Chunk> {
        self.positions.get(id).map(|&pos| &self.entries[pos].chunk)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Score descending, then chunk id ascending.
fn compare_ranked(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot_product / (norm_a * norm_b);
    if score.is_nan() {
        0.0
    } else {
        score
    }
}
