//! Text chunking with a fixed character window and overlap.
//!
//! Offsets and lengths are counted in characters (Unicode scalar values), so
//! a window never splits a code point. Consecutive chunks of one source share
//! exactly `overlap_length` characters.

use crate::types::{Chunk, ChunkId, SourceRecord};
use docsmith_core::{AppError, AppResult};
use sha2::{Digest, Sha256};

/// Splits source content into overlapping character windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSplitter {
    target_length: usize,
    overlap_length: usize,
}

impl ChunkSplitter {
    /// Create a splitter.
    ///
    /// Rejects a zero target length and an overlap that is not strictly
    /// smaller than the target.
    pub fn new(target_length: usize, overlap_length: usize) -> AppResult<Self> {
        if target_length == 0 {
            return Err(AppError::Config(
                "chunking.target_length must be greater than 0".to_string(),
            ));
        }
        if overlap_length >= target_length {
            return Err(AppError::Config(format!(
                "chunking.overlap_length ({}) must be smaller than target_length ({})",
                overlap_length, target_length
            )));
        }

        Ok(Self {
            target_length,
            overlap_length,
        })
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn overlap_length(&self) -> usize {
        self.overlap_length
    }

    /// Split one record. Empty content yields no chunks.
    pub fn split(&self, record: &SourceRecord) -> Vec<Chunk> {
        let chars: Vec<char> = record.content.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let step = self.target_length - self.overlap_length;
        let mut chunks = Vec::with_capacity(total / step + 1);
        let mut start = 0;

        loop {
            let end = (start + self.target_length).min(total);
            let text: String = chars[start..end].iter().collect();

            chunks.push(Chunk {
                id: ChunkId::new(record.identifier.clone(), chunks.len()),
                fingerprint: calculate_hash(&text),
                text,
                start_offset: start,
                end_offset: end,
            });

            if end == total {
                break;
            }
            start += step;
        }

        tracing::debug!(
            "Split {} into {} chunks ({} chars)",
            record.identifier,
            chunks.len(),
            total
        );

        chunks
    }

    /// Split every record, preserving record order.
    pub fn split_all(&self, records: &[SourceRecord]) -> Vec<Chunk> {
        records.iter().flat_map(|r| self.split(r)).collect()
    }
}

/// SHA-256 hex digest of a text.
pub fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
