//! Source collection.
//!
//! Walks a root directory in a deterministic order and turns every eligible
//! text file into a [`SourceRecord`]. Oversized, binary and unreadable files
//! are skipped with a warning; only an empty result is fatal.

use crate::types::{CollectOutcome, SkipReason, SkippedFile, SourceRecord};
use docsmith_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Default size limit per file (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Collection filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Accepted extensions without the leading dot; empty accepts all
    pub extensions: Vec<String>,

    /// Files larger than this many bytes are skipped
    pub max_file_size: u64,

    /// Entry names never visited; `*` allowed at either end
    pub exclude: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude: vec![
                "__pycache__".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
                "test_*".to_string(),
                "*_test.py".to_string(),
            ],
        }
    }
}

impl CollectorConfig {
    /// Accept files with the given extensions (leading dots are ignored).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "collection.max_file_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Collects source records under a root directory.
#[derive(Debug, Clone)]
pub struct SourceCollector {
    config: CollectorConfig,
}

impl SourceCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Collect every eligible file under `root`.
    ///
    /// Records come back sorted by identifier. Returns
    /// `AppError::NoEligibleFiles` if nothing survives filtering.
    pub fn collect(&self, root: &Path) -> AppResult<CollectOutcome> {
        if !root.is_dir() {
            return Err(AppError::Config(format!(
                "Source root is not a directory: {}",
                root.display()
            )));
        }

        tracing::info!("Collecting sources under {:?}", root);

        let mut outcome = CollectOutcome::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Unreadable directories are not fatal
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches_extension(entry.path()) {
                continue;
            }

            let identifier = relative_identifier(root, entry.path());
            match self.read_record(&entry, &identifier) {
                Ok(record) => {
                    tracing::debug!("Collected {} ({} bytes)", record.identifier, record.size);
                    outcome.records.push(record);
                }
                Err(reason) => {
                    tracing::warn!("Skipping {}: {}", identifier, reason);
                    outcome.skipped.push(SkippedFile { identifier, reason });
                }
            }
        }

        outcome
            .records
            .sort_by(|a, b| a.identifier.cmp(&b.identifier));

        if outcome.records.is_empty() {
            return Err(AppError::NoEligibleFiles(root.to_path_buf()));
        }

        tracing::info!(
            "Collected {} files ({} bytes), skipped {}",
            outcome.records.len(),
            outcome.total_bytes(),
            outcome.skipped.len()
        );

        Ok(outcome)
    }

    fn read_record(&self, entry: &DirEntry, identifier: &str) -> Result<SourceRecord, SkipReason> {
        let size = entry
            .metadata()
            .map_err(|e| SkipReason::Unreadable {
                message: e.to_string(),
            })?
            .len();

        if size > self.config.max_file_size {
            return Err(SkipReason::TooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }

        let bytes = std::fs::read(entry.path()).map_err(|e| SkipReason::Unreadable {
            message: e.to_string(),
        })?;

        if bytes.contains(&0) {
            return Err(SkipReason::NotText);
        }

        let content = String::from_utf8(bytes).map_err(|_| SkipReason::NotText)?;
        Ok(SourceRecord::new(identifier, entry.path(), content))
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.config.extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        self.config
            .exclude
            .iter()
            .any(|pattern| name_matches(&name, pattern))
    }
}

/// Match an entry name against an exclude pattern.
fn name_matches(name: &str, pattern: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        name.starts_with(prefix)
    } else if let Some(suffix) = pattern.strip_prefix('*') {
        name.ends_with(suffix)
    } else {
        name == pattern
    }
}

/// `/`-separated path of `path` relative to `root`.
fn relative_identifier(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Human-readable listing of the collected files with line counts.
///
/// This is what the first stage sees as the overview of the codebase.
pub fn source_summary(records: &[SourceRecord]) -> String {
    let mut summary = String::new();
    for record in records {
        summary.push_str(&format!("- {} ({} lines)\n", record.identifier, record.lines));
    }
    let total_lines: usize = records.iter().map(|r| r.lines).sum();
    summary.push_str(&format!(
        "\nTotal: {} files, {} lines",
        records.len(),
        total_lines
    ));
    summary
}
