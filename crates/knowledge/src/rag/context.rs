//! Grounding context assembly.
//!
//! Embeds all chunks into a [`SimilarityIndex`] once per run, then answers
//! queries with a bounded block of source excerpts.

use crate::embeddings::{embed_all, EmbeddingProvider};
use crate::index::SimilarityIndex;
use crate::progress::ProgressReporter;
use crate::rag::types::{GroundingContext, RetrievalConfig};
use crate::types::Chunk;
use crate::vector_index::VectorIndex;
use docsmith_core::AppResult;
use std::collections::HashSet;
use std::sync::Arc;

const EXCERPT_SEPARATOR: &str = "\n\n---\n\n";

/// Builds the similarity index and per-query grounding context.
#[derive(Debug, Clone)]
pub struct RagContextBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    progress: ProgressReporter,
}

impl RagContextBuilder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Self {
        Self {
            provider,
            config,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Embed every chunk and build the index.
    ///
    /// Any embedding failure is returned unchanged; no chunk is ever indexed
    /// without its embedding.
    pub async fn build_index(&self, chunks: Vec<Chunk>) -> AppResult<SimilarityIndex> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_all(
            self.provider.as_ref(),
            &texts,
            self.config.embed_concurrency,
            &self.progress,
        )
        .await?;

        SimilarityIndex::build(chunks.into_iter().zip(embeddings).collect())
    }

    /// Retrieve the grounding context for `query`.
    ///
    /// An empty index yields an empty context without embedding the query.
    pub async fn build_context(
        &self,
        query: &str,
        index: &dyn VectorIndex,
    ) -> AppResult<GroundingContext> {
        if index.is_empty() {
            return Ok(GroundingContext::empty());
        }

        let query_embedding = self.provider.embed(query).await?;
        let hits = index.search(&query_embedding, self.config.top_k);

        let mut selected: Vec<&Chunk> = Vec::with_capacity(hits.len());
        let mut fingerprints: HashSet<&str> = HashSet::new();

        for hit in &hits {
            let Some(chunk) = index.chunk(&hit.chunk_id) else {
                continue;
            };
            if fingerprints.contains(chunk.fingerprint.as_str())
                || selected.iter().any(|s| chunk.is_contained_in(s))
            {
                tracing::trace!("Dropping redundant chunk {}", chunk.id);
                continue;
            }
            fingerprints.insert(chunk.fingerprint.as_str());
            selected.push(chunk);
        }

        let context = assemble(&selected, self.config.max_context_length);

        tracing::debug!(
            "Grounding context: {} hits, {} used, {} chars{}",
            hits.len(),
            context.sources.len(),
            context.text.chars().count(),
            if context.truncated { " (truncated)" } else { "" }
        );

        Ok(context)
    }
}

/// Header naming the excerpt's location.
fn excerpt_header(chunk: &Chunk) -> String {
    format!(
        "[{} chars {}-{}]",
        chunk.source(),
        chunk.start_offset,
        chunk.end_offset
    )
}

/// Concatenate excerpts in order, stopping at `max_chars` characters.
fn assemble(chunks: &[&Chunk], max_chars: usize) -> GroundingContext {
    let mut context = GroundingContext::empty();
    let mut used = 0usize;

    for chunk in chunks {
        let mut piece = String::new();
        if !context.sources.is_empty() {
            piece.push_str(EXCERPT_SEPARATOR);
        }
        piece.push_str(&excerpt_header(chunk));
        piece.push('\n');
        let preamble_len = piece.chars().count();
        piece.push_str(&chunk.text);

        let piece_len = piece.chars().count();
        let remaining = max_chars.saturating_sub(used);

        if piece_len <= remaining {
            context.text.push_str(&piece);
            context.sources.push(chunk.id.clone());
            used += piece_len;
            continue;
        }

        // A chunk is only listed if some of its own text made it in.
        if remaining > preamble_len {
            context.text.extend(piece.chars().take(remaining));
            context.sources.push(chunk.id.clone());
        }
        context.truncated = true;
        break;
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{calculate_hash, ChunkSplitter};
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::{ChunkId, SourceRecord};
    use docsmith_core::{AppError, ProviderFailure};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn provider_name(&self) -> &str {
            "counting"
        }

        fn model_name(&self) -> &str {
            "counting-v1"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            if self.fail {
                return Err(AppError::provider(ProviderFailure::Unavailable, "offline"));
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn records() -> Vec<SourceRecord> {
        vec![
            SourceRecord::new(
                "collector.py",
                "collector.py",
                "def collect_files(root):\n    return sorted(walk(root))\n".to_string(),
            ),
            SourceRecord::new(
                "pipeline.py",
                "pipeline.py",
                "class Pipeline:\n    def run(self):\n        generate(); edit(); polish()\n"
                    .to_string(),
            ),
        ]
    }

    fn builder(provider: Arc<dyn EmbeddingProvider>, max_len: usize) -> RagContextBuilder {
        RagContextBuilder::new(
            provider,
            RetrievalConfig {
                top_k: 3,
                max_context_length: max_len,
                ..RetrievalConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_build_context_grounds_on_relevant_source() {
        let splitter = ChunkSplitter::new(1000, 200).unwrap();
        let rag = builder(Arc::new(TrigramProvider::new(256)), 6000);

        let index = rag.build_index(splitter.split_all(&records())).await.unwrap();
        assert_eq!(index.len(), 2);

        let context = rag
            .build_context("how are files collected from the root", &index)
            .await
            .unwrap();

        assert_eq!(context.sources[0], ChunkId::new("collector.py", 0));
        assert!(context.text.starts_with("[collector.py chars 0-"));
        assert!(context.text.contains(EXCERPT_SEPARATOR));
        assert!(!context.truncated);
    }

    #[tokio::test]
    async fn test_build_context_is_deterministic() {
        let splitter = ChunkSplitter::new(20, 5).unwrap();
        let rag = builder(Arc::new(TrigramProvider::new(128)), 6000);
        let chunks = splitter.split_all(&records());

        let first = rag.build_index(chunks.clone()).await.unwrap();
        let second = rag.build_index(chunks).await.unwrap();

        let a = rag.build_context("pipeline run", &first).await.unwrap();
        let b = rag.build_context("pipeline run", &second).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_duplicate_content_is_deduplicated() {
        let splitter = ChunkSplitter::new(1000, 0).unwrap();
        let same = "print('hello')\n".to_string();
        let records = vec![
            SourceRecord::new("a.py", "a.py", same.clone()),
            SourceRecord::new("b.py", "b.py", same),
        ];
        let rag = builder(Arc::new(TrigramProvider::new(64)), 6000);

        let index = rag.build_index(splitter.split_all(&records)).await.unwrap();
        let context = rag.build_context("hello", &index).await.unwrap();

        // Equal scores tie-break to a.py; b.py repeats its fingerprint.
        assert_eq!(context.sources, vec![ChunkId::new("a.py", 0)]);
    }

    #[tokio::test]
    async fn test_context_truncated_at_char_limit() {
        let splitter = ChunkSplitter::new(1000, 0).unwrap();
        let rag = builder(Arc::new(TrigramProvider::new(64)), 40);

        let index = rag.build_index(splitter.split_all(&records())).await.unwrap();
        let context = rag.build_context("pipeline", &index).await.unwrap();

        assert!(context.truncated);
        assert_eq!(context.text.chars().count(), 40);
        assert_eq!(context.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_skips_provider() {
        let provider = Arc::new(CountingProvider::default());
        let rag = builder(provider.clone(), 6000);

        let index = rag.build_index(Vec::new()).await.unwrap();
        let context = rag.build_context("anything", &index).await.unwrap();

        assert!(context.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let rag = builder(provider, 6000);
        let splitter = ChunkSplitter::new(1000, 0).unwrap();

        let err = rag
            .build_index(splitter.split_all(&records()))
            .await
            .unwrap_err();
        assert_eq!(err.provider_failure(), Some(ProviderFailure::Unavailable));
    }

    fn chunk(source: &str, text: &str) -> Chunk {
        Chunk {
            id: ChunkId::new(source, 0),
            text: text.to_string(),
            start_offset: 0,
            end_offset: text.chars().count(),
            fingerprint: calculate_hash(text),
        }
    }

    #[test]
    fn test_assemble_drops_chunk_without_room_for_text() {
        let a = chunk("a.py", "alpha body");
        let b = chunk("b.py", "beta body");
        let first_len = "[a.py chars 0-10]\nalpha body".chars().count();

        let context = assemble(&[&a, &b], first_len + 3);

        assert!(context.truncated);
        assert_eq!(context.sources, vec![ChunkId::new("a.py", 0)]);
        assert_eq!(context.text, "[a.py chars 0-10]\nalpha body");
    }

    #[test]
    fn test_assemble_keeps_partial_chunk_text() {
        let a = chunk("a.py", "alpha body");
        let b = chunk("b.py", "beta body");
        let first_len = "[a.py chars 0-10]\nalpha body".chars().count();
        let preamble_len = EXCERPT_SEPARATOR.len() + "[b.py chars 0-9]\n".len();

        let context = assemble(&[&a, &b], first_len + preamble_len + 4);

        assert!(context.truncated);
        assert_eq!(context.sources.len(), 2);
        assert!(context.text.ends_with("[b.py chars 0-9]\nbeta"));
    }

    #[test]
    fn test_assemble_respects_multibyte_limit() {
        let chunk = Chunk {
            id: ChunkId::new("ü.py", 0),
            text: "ééééé".to_string(),
            start_offset: 0,
            end_offset: 5,
            fingerprint: "f".to_string(),
        };

        let context = assemble(&[&chunk], 18);
        assert!(context.truncated);
        assert_eq!(context.text.chars().count(), 18);
    }
}
