//! Core types for source material and retrieval.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One eligible file read from the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Path relative to the root, `/`-separated; unique within a run
    pub identifier: String,

    /// Absolute (or root-joined) path on disk
    pub path: PathBuf,

    /// Full text content
    pub content: String,

    /// Size in bytes
    pub size: u64,

    /// Number of lines
    pub lines: usize,
}

impl SourceRecord {
    /// Build a record, deriving size and line count from the content.
    pub fn new(identifier: impl Into<String>, path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            identifier: identifier.into(),
            path: path.into(),
            size: content.len() as u64,
            lines: content.lines().count(),
            content,
        }
    }
}

/// Identity of a chunk: its source and position within that source.
///
/// Orders by source identifier, then sequence number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId {
    pub source: String,
    pub sequence: usize,
}

impl ChunkId {
    pub fn new(source: impl Into<String>, sequence: usize) -> Self {
        Self {
            source: source.into(),
            sequence,
        }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source, self.sequence)
    }
}

/// A contiguous character window of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,

    /// Chunk text
    pub text: String,

    /// Start offset in characters (inclusive)
    pub start_offset: usize,

    /// End offset in characters (exclusive)
    pub end_offset: usize,

    /// SHA-256 hex digest of `text`
    pub fingerprint: String,
}

impl Chunk {
    /// Identifier of the source this chunk was cut from.
    pub fn source(&self) -> &str {
        &self.id.source
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Whether this chunk's character range lies within `other`'s range of
    /// the same source.
    pub fn is_contained_in(&self, other: &Chunk) -> bool {
        self.source() == other.source()
            && self.start_offset >= other.start_offset
            && self.end_offset <= other.end_offset
    }
}

/// A retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub score: f32,
}

/// Why a file under the root was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Larger than the configured size limit
    TooLarge { size: u64, limit: u64 },
    /// Not valid UTF-8, or contains NUL bytes
    NotText,
    /// Could not be read
    Unreadable { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size, limit } => {
                write!(f, "too large ({} bytes, limit {})", size, limit)
            }
            Self::NotText => f.write_str("not a text file"),
            Self::Unreadable { message } => write!(f, "unreadable: {}", message),
        }
    }
}

/// A file that matched the filters but was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub identifier: String,
    pub reason: SkipReason,
}

/// Result of a collection pass.
#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    /// Eligible records in lexicographic identifier order
    pub records: Vec<SourceRecord>,

    /// Files skipped with a warning
    pub skipped: Vec<SkippedFile>,
}

impl CollectOutcome {
    /// Total bytes across all records.
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }

    /// Total lines across all records.
    pub fn total_lines(&self) -> usize {
        self.records.iter().map(|r| r.lines).sum()
    }
}
