//! Source collection and retrieval for document generation.
//!
//! Walks a source tree, splits files into overlapping chunks, embeds them
//! into an in-memory similarity index and assembles grounding context for
//! each generation stage.

pub mod chunker;
pub mod collector;
pub mod embeddings;
pub mod index;
pub mod progress;
pub mod rag;
pub mod types;
pub mod vector_index;

pub use chunker::{calculate_hash, ChunkSplitter};
pub use collector::{source_summary, CollectorConfig, SourceCollector};
pub use embeddings::{create_provider, embed_all, EmbeddingConfig, EmbeddingProvider};
pub use index::{cosine_similarity, SimilarityIndex};
pub use progress::{Phase, ProgressCallback, ProgressEvent, ProgressReporter};
pub use rag::{ContextMode, GroundingContext, RagContextBuilder, RetrievalConfig};
pub use types::{
    Chunk, ChunkId, CollectOutcome, ScoredChunk, SkipReason, SkippedFile, SourceRecord,
};
pub use vector_index::VectorIndex;
