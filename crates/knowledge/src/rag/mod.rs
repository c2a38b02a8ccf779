//! Retrieval-augmented grounding.
//!
//! [`RagContextBuilder`] owns the embedding side of a run: it embeds chunks
//! into a [`crate::SimilarityIndex`] and turns queries into
//! [`GroundingContext`] blocks for the generation prompts.

pub mod context;
pub mod types;

pub use context::RagContextBuilder;
pub use types::{ContextMode, GroundingContext, RetrievalConfig};
