//! Vector index abstraction for retrieval.
//!
//! Retrieval code depends on this trait rather than on a concrete index.

use crate::types::{Chunk, ChunkId, ScoredChunk};

/// Read-only similarity search over embedded chunks.
pub trait VectorIndex: Send + Sync {
    /// Top-`k` chunks most similar to `query_embedding`.
    ///
    /// Results are ordered by descending score; equal scores are ordered by
    /// ascending chunk id.
    fn search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk>;

    /// Look up a chunk by id.
    fn chunk(&self, id: &ChunkId) -> Option<&Chunk>;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
